use loopmatch::{
    dispatcher::{BatchOptions, Dispatcher},
    error::LoopmatchError,
    patterns::PatternSource,
    rna_sequence::RnaSequence,
    sink::CsvSink,
    vienna::ViennaStructure,
};
use serde::Serialize;
use std::{env, sync::Arc};

#[derive(Serialize)]
struct RunSummary {
    tasks: usize,
    gate_permits: usize,
    output: String,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  loopmatch_cli --version\n  \
  loopmatch_cli --fasta FILE --patterns FILE --out OUT.csv [options]\n  \
  loopmatch_cli --vienna FILE --patterns FILE --out OUT.csv [options]\n\n\
Options:\n  \
  --extended            fold each sequence before matching\n  \
  --reverse             also search the reverse-complement strand\n  \
  --min N               minimum loop length (default 4)\n  \
  --max N               maximum loop length (default 16)\n  \
  --temperature N       folding temperature in Celsius (default 37)\n  \
  --no-lonely-pairs     skip lonely-pair hairpins / pass --noLP to the fold\n  \
  --additional SEQ      additional reference sequence filter"
    );
}

struct CliArgs {
    fasta: Option<String>,
    vienna: Option<String>,
    patterns: Option<String>,
    out: Option<String>,
    options: BatchOptions,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        fasta: None,
        vienna: None,
        patterns: None,
        out: None,
        options: BatchOptions::default(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next()
                .map(|v| v.to_string())
                .ok_or_else(|| format!("Missing value for {name}"))
        };
        match arg.as_str() {
            "--fasta" => parsed.fasta = Some(value_for("--fasta")?),
            "--vienna" => parsed.vienna = Some(value_for("--vienna")?),
            "--patterns" => parsed.patterns = Some(value_for("--patterns")?),
            "--out" => parsed.out = Some(value_for("--out")?),
            "--extended" => parsed.options.extended = true,
            "--reverse" => parsed.options.search_reverse = true,
            "--no-lonely-pairs" => parsed.options.params.avoid_lonely_pairs = true,
            "--min" => {
                parsed.options.params.min_length = value_for("--min")?
                    .parse()
                    .map_err(|e| format!("Invalid --min value: {e}"))?
            }
            "--max" => {
                parsed.options.params.max_length = value_for("--max")?
                    .parse()
                    .map_err(|e| format!("Invalid --max value: {e}"))?
            }
            "--temperature" => {
                parsed.options.params.temperature = value_for("--temperature")?
                    .parse()
                    .map_err(|e| format!("Invalid --temperature value: {e}"))?
            }
            "--additional" => {
                parsed.options.params.additional_sequence = Some(value_for("--additional")?)
            }
            other => return Err(format!("Unknown argument '{other}'")),
        }
    }
    Ok(parsed)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LoopmatchError> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{text}");
    Ok(())
}

fn run(args: CliArgs) -> Result<(), LoopmatchError> {
    let patterns_file = args
        .patterns
        .ok_or_else(|| "Missing --patterns".to_string())?;
    let out = args.out.ok_or_else(|| "Missing --out".to_string())?;
    let sink = Arc::new(CsvSink::from_path(&out).map_err(|e| e.to_string())?);
    let dispatcher = Dispatcher::new().map_err(|e| e.to_string())?;

    let summary = match (args.fasta, args.vienna) {
        (Some(fasta), None) => {
            let sequences = RnaSequence::from_fasta_file(&fasta).map_err(|e| e.to_string())?;
            if sequences.is_empty() {
                return Err(format!("No sequences found in '{fasta}'").into());
            }
            // every task gets its own single-pass cursor over the file
            let mut jobs = Vec::with_capacity(sequences.len());
            for sequence in sequences {
                let patterns = PatternSource::from_file(&patterns_file)?;
                jobs.push((sequence, patterns));
            }
            dispatcher
                .run_sequences(jobs, &args.options, sink)
                .map_err(|e| e.to_string())?
        }
        (None, Some(vienna)) => {
            let vienna = ViennaStructure::from_file(&vienna).map_err(|e| e.to_string())?;
            let patterns = PatternSource::from_file(&patterns_file)?;
            dispatcher
                .run_structure(vienna, patterns, &args.options.params, sink)
                .map_err(|e| e.to_string())?
        }
        (Some(_), Some(_)) => {
            return Err("Pass either --fasta or --vienna, not both".to_string().into());
        }
        (None, None) => {
            return Err("Missing input: pass --fasta or --vienna".to_string().into());
        }
    };

    print_json(&RunSummary {
        tasks: summary.tasks,
        gate_permits: summary.gate_permits,
        output: out,
    })
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return;
    }
    if args.iter().any(|a| a == "--version") {
        println!("loopmatch_cli {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            usage();
            std::process::exit(2);
        }
    };
    if let Err(e) = run(parsed) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
