use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process;

use homolog_traits::{annotate_search_results, prepare_project};
use homolog_traits::error::Result;
use homolog_traits::fasta::write_fasta;
use homolog_traits::hits::write_hits;
use homolog_traits::mmseqs::{add_cluster_header, ClusterParams, Mmseqs, SearchParams};

/// Search seeds against a reference database, then annotate and reshape
/// the hits with trait tables.
#[derive(Parser)]
#[command(name = "homolog-annotate")]
#[command(version)]
struct Args {
    /// Input seeds FASTA file
    #[arg(short, long)]
    input: PathBuf,

    /// Path to the MMseqs2 database
    #[arg(short, long)]
    database: PathBuf,

    /// Output directory / project name
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Directory of `<trait>_ncbi.csv` tables
    #[arg(short, long)]
    traits_dir: Option<PathBuf>,

    /// Scratch directory for mmseqs
    #[arg(long, default_value = "tmp")]
    tmp_dir: PathBuf,
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg);
    spinner
}

fn run(args: Args) -> Result<()> {
    let out = &args.output_dir;
    prepare_project(&args.input, out)?;

    let mmseqs = Mmseqs::locate(&args.tmp_dir)?;
    let aln_path = out.join("alnRes.m8");
    let fasta_path = out.join("hits.fasta");
    let wide_path = out.join("wide_table.tsv");
    let long_path = out.join("long_table.tsv");

    // 1. Homolog search
    let sp = spinner("blue", "Searching seeds against the database...");
    mmseqs.search(&args.input, &args.database, &aln_path, &SearchParams::default())?;
    sp.finish_with_message("Search finished.");

    // 2. Trait annotation
    let sp = spinner("green", "Annotating hits...");
    let results = annotate_search_results(&aln_path, args.traits_dir.as_deref())?;
    write_fasta(&fasta_path, &results.fasta)?;
    sp.finish_with_message(format!(
        "{} hits over {} targets annotated.",
        results.long.rows.len(),
        results.wide.rows.len()
    ));

    // 3. Clustering
    let sp = spinner("yellow", "Clustering hit sequences...");
    let cluster_path = mmseqs.cluster(
        &fasta_path,
        &args.database,
        &out.join("clusterRes_60"),
        &ClusterParams::default(),
    )?;
    let clusters = add_cluster_header(&cluster_path)?;
    sp.finish_with_message(format!("{} cluster memberships.", clusters));

    // 4. Outputs
    let sp = spinner("cyan", "Writing output files...");
    write_hits(&aln_path, &results.hits)?;
    results.write_wide_table(&wide_path)?;
    results.write_long_table(&long_path)?;
    sp.finish_with_message("Output files created.");

    log::info!("Done. Final files with headers:");
    for path in [&aln_path, &wide_path, &long_path, &cluster_path] {
        log::info!("  - {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        process::exit(1);
    }
}
