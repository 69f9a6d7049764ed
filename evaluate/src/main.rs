use std::fs::File;
use std::io::{prelude::*, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use gramcat::{LanguageIdentifier, Model};

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate the accuracy of Gramcat.")]
struct Args {
    /// The model file to use when identifying languages
    #[arg(long)]
    model: PathBuf,

    /// A text file containing one sample per line
    #[arg(long)]
    text: PathBuf,

    /// A file containing the expected language label of each line of --text
    #[arg(long)]
    labels: PathBuf,

    /// The number of leading n-grams scored for each line
    #[arg(long, default_value = "1000")]
    max_features: usize,

    /// Print the running accuracy every N samples
    #[arg(long, default_value = "1000")]
    sample_interval: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;
    let identifier = LanguageIdentifier::new(model, args.max_features)?;

    eprintln!("Start evaluation");
    let text = BufReader::new(File::open(args.text)?);
    let labels = BufReader::new(File::open(args.labels)?);
    let mut n_total = 0;
    let mut n_correct = 0;
    let start = Instant::now();
    for (line, label) in text.lines().zip(labels.lines()) {
        let line = line?;
        let label = label?;
        let results = identifier.identify(&line);
        if results
            .first()
            .map_or(false, |r| r.category().matches(label.trim()))
        {
            n_correct += 1;
        }
        n_total += 1;
        if args.sample_interval != 0 && n_total % args.sample_interval == 0 {
            let duration = start.elapsed();
            println!(
                "# of samples: {}, accuracy: {}, speed: {} [classifications/sec]",
                n_total,
                n_correct as f64 / n_total as f64,
                n_total as f64 / duration.as_secs_f64(),
            );
        }
    }

    let duration = start.elapsed();
    println!("# of samples: {}", n_total);
    println!("Correct: {}", n_correct);
    println!("Accuracy: {}", n_correct as f64 / n_total as f64);
    eprintln!("Elapsed: {} [sec]", duration.as_secs_f64());

    Ok(())
}
