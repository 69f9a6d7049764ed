use std::fs;
use std::path::PathBuf;

use clap::Parser;
use gramcat::Model;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(about = "A program to manipulate trained models.")]
struct Args {
    /// Input path of the model file
    #[arg(long)]
    model_in: PathBuf,

    /// Output path of the model file
    #[arg(long)]
    model_out: Option<PathBuf>,

    /// Keep only the languages matching this label (can be repeated)
    #[arg(long)]
    keep: Vec<String>,

    /// Keep only the N most frequent n-grams of each language
    #[arg(long)]
    prune_rank: Option<usize>,

    /// Output the languages and statistics of their distributions as CSV.
    #[arg(long)]
    dump_languages: Option<PathBuf>,

    /// Output all n-grams of all languages as CSV.
    #[arg(long)]
    dump_ngrams: Option<PathBuf>,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

#[derive(Serialize)]
struct LanguageRecord<'a> {
    iso639_2t: &'a str,
    iso639_3: &'a str,
    english_name: &'a str,
    local_name: &'a str,
    distinct_represented: u64,
    distinct_noise: u64,
    total_represented: u64,
    total_noise: u64,
    metadata: String,
}

#[derive(Serialize)]
struct NgramRecord<'a> {
    language: &'a str,
    ngram: &'a str,
    count: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(fs::File::open(args.model_in)?)?;
    let mut model = Model::read(&mut f)?;

    if !args.keep.is_empty() {
        model.retain(|lm| args.keep.iter().any(|label| lm.language().matches(label)));
        eprintln!("# of languages: {}", model.language_models().len());
    }

    if let Some(n) = args.prune_rank {
        eprintln!("Pruning distributions...");
        model.prune_by_rank(n);
    }

    match model.language_names() {
        Some((scheme, names)) => eprintln!(
            "Contains models for the following languages (by {scheme}): {}",
            names.join(", ")
        ),
        None => eprintln!("WARNING! Some of the language models don't have any language name"),
    }

    if let Some(path) = args.dump_languages {
        eprintln!("Saving language list...");
        let mut wtr = csv::Writer::from_writer(fs::File::create(path)?);
        for lm in model.language_models() {
            let language = lm.language();
            let features = lm.features();
            let metadata: Vec<String> = lm
                .metadata()
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            wtr.serialize(LanguageRecord {
                iso639_2t: language.iso639_2t(),
                iso639_3: language.iso639_3(),
                english_name: language.english_name(),
                local_name: language.local_name(),
                distinct_represented: features.distinct_represented_count(),
                distinct_noise: features.distinct_noise_count(),
                total_represented: features.total_represented(),
                total_noise: features.total_noise(),
                metadata: metadata.join(";"),
            })?;
        }
        wtr.flush()?;
    }

    if let Some(path) = args.dump_ngrams {
        eprintln!("Saving n-grams...");
        let mut wtr = csv::Writer::from_writer(fs::File::create(path)?);
        for lm in model.language_models() {
            let language = lm.language().any_name().unwrap_or("");
            let mut ngrams: Vec<(&str, u64)> = lm.features().iter().collect();
            ngrams.sort_unstable_by(|(n1, c1), (n2, c2)| c2.cmp(c1).then_with(|| n1.cmp(n2)));
            for (ngram, count) in ngrams {
                wtr.serialize(NgramRecord {
                    language,
                    ngram,
                    count,
                })?;
            }
        }
        wtr.flush()?;
    }

    if let Some(path) = args.model_out {
        eprintln!("Saving model file...");
        let mut f = zstd::Encoder::new(fs::File::create(path)?, 19)?;
        f.multithread(args.zstd_workers)?;
        model.write(&mut f)?;
        f.finish()?;
    }

    Ok(())
}
