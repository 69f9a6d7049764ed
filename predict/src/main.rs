use std::fs::File;
use std::io::{prelude::*, stdin, stdout, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use gramcat::{LanguageIdentifier, Model};

#[derive(Parser, Debug)]
#[command(about = "A program to identify the language of each input line.")]
struct Args {
    /// The model file to use when identifying languages
    #[arg(long)]
    model: PathBuf,

    /// The number of leading n-grams scored for each line
    #[arg(long, default_value = "1000")]
    max_features: usize,

    /// Read only the first N lines of the whole input
    #[arg(long)]
    max_lines: Option<u64>,

    /// The number of candidates printed for each line
    #[arg(long, default_value = "1")]
    n_best: usize,

    /// Print scores next to the candidates
    #[arg(long)]
    scores: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;
    let identifier = LanguageIdentifier::new(model, args.max_features)?;

    eprintln!("Start identification");
    let mut n_lines = 0;
    let mut n_chars = 0;
    let start = Instant::now();
    let mut out = BufWriter::new(stdout().lock());
    for line in stdin().lock().lines() {
        if args.max_lines.map_or(false, |max_lines| n_lines >= max_lines) {
            break;
        }
        let line = line?;
        n_lines += 1;
        n_chars += line.chars().count();
        let results = identifier.identify(&line);
        let candidates: Vec<String> = results
            .iter()
            .take(args.n_best)
            .map(|r| {
                let name = r.category().any_name().unwrap_or("-");
                if args.scores {
                    format!("{name}:{}", r.score())
                } else {
                    name.to_string()
                }
            })
            .collect();
        writeln!(out, "{}", candidates.join("\t"))?;
    }
    out.flush()?;
    let duration = start.elapsed();
    eprintln!("Elapsed: {} [sec]", duration.as_secs_f64());
    eprintln!(
        "Speed: {} [lines/sec], {} [chars/sec]",
        n_lines as f64 / duration.as_secs_f64(),
        n_chars as f64 / duration.as_secs_f64()
    );

    Ok(())
}
