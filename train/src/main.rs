use std::fs::File;
use std::io::{prelude::*, stderr, BufReader};
use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use gramcat::{LanguageInfo, Trainer};

fn parse_corpus(s: &str) -> Result<(String, PathBuf), String> {
    let (label, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=PATH, but got {s:?}"))?;
    if label.is_empty() {
        return Err(format!("missing label in {s:?}"));
    }
    Ok((label.to_string(), PathBuf::from(path)))
}

#[derive(Parser, Debug)]
#[command(
    about = "A program to train language identification models of Gramcat.",
    group = ArgGroup::new("dataset").required(true).multiple(true),
)]
struct Args {
    /// A text file containing one sample per line
    #[arg(long, group = "dataset", requires = "labels")]
    text: Option<PathBuf>,

    /// A file containing the language label of each line of --text
    #[arg(long, requires = "text")]
    labels: Option<PathBuf>,

    /// A monolingual corpus given as LABEL=PATH
    #[arg(long, group = "dataset", value_parser = parse_corpus)]
    corpus: Vec<(String, PathBuf)>,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// The maximum length of character n-grams
    #[arg(long, default_value = "5")]
    ngram: usize,

    /// The maximum number of distinct n-grams kept for each language
    #[arg(long, default_value = "4000")]
    max_dist_size: usize,

    /// N-grams occurring at most this number of times are pruned (0 disables this pruning)
    #[arg(long, default_value = "0")]
    min_count: u64,

    /// Read only the first N lines of each corpus
    #[arg(long)]
    max_lines: Option<u64>,

    /// The number of languages trained in parallel
    #[arg(long, default_value = "1")]
    n_threads: usize,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

/// Groups the lines of `text` by the label on the same line of `labels`, in first-seen order.
fn load_labelled_text(
    text: PathBuf,
    labels: PathBuf,
) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let text = BufReader::new(File::open(text)?);
    let labels = BufReader::new(File::open(labels)?);
    let mut groups: Vec<(String, String)> = vec![];
    for (i, (line, label)) in text.lines().zip(labels.lines()).enumerate() {
        if i % 10000 == 0 {
            eprint!("# of lines: {i}\r");
            stderr().flush()?;
        }
        let line = line?;
        let label = label?;
        let label = label.trim();
        let idx = match groups.iter().position(|(l, _)| l == label) {
            Some(idx) => idx,
            None => {
                groups.push((label.to_string(), String::new()));
                groups.len() - 1
            }
        };
        let buf = &mut groups[idx].1;
        buf.push_str(&line);
        buf.push('\n');
    }
    eprintln!("# of labels: {}", groups.len());
    Ok(groups)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    eprintln!("Loading dataset...");
    let mut inputs: Vec<(LanguageInfo, Box<dyn Read + Send>)> = vec![];
    if let (Some(text), Some(labels)) = (args.text, args.labels) {
        for (label, buf) in load_labelled_text(text, labels)? {
            inputs.push((
                LanguageInfo::from_label(label),
                Box::new(std::io::Cursor::new(buf.into_bytes())),
            ));
        }
    }
    for (label, path) in args.corpus {
        eprintln!("Opening {path:?} for {label} ...");
        let f = BufReader::new(File::open(path)?);
        inputs.push((LanguageInfo::from_label(label), Box::new(f)));
    }
    eprintln!("# of languages: {}", inputs.len());

    let mut trainer = Trainer::new(args.ngram)?
        .max_distribution_size(args.max_dist_size)
        .min_count_threshold(args.min_count)
        .n_threads(args.n_threads)?;
    if let Some(max_lines) = args.max_lines {
        trainer = trainer.max_lines(max_lines);
    }

    eprintln!("Start training...");
    let model = trainer.train(inputs)?;
    eprintln!("Finish training.");
    match model.language_names() {
        Some((scheme, names)) => eprintln!(
            "Contains models for the following languages (by {scheme}): {}",
            names.join(", ")
        ),
        None => eprintln!("WARNING! Some of the language models don't have any language name"),
    }

    let mut f = zstd::Encoder::new(File::create(args.model)?, 19)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;

    Ok(())
}
