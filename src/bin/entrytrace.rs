//! entrytrace command-line tool.

use anyhow::{Context, Result};
use entrytrace::passes::entry_trace::EntryTraceOptions;
use entrytrace::pipeline::{self, Outcome, PipelineOptions};
use entrytrace::{PointerStyle, PrefixPolicy};
use log::debug;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "entrytrace",
    about = "Compile a source file to LLVM IR and log every function entry."
)]
struct Options {
    #[structopt(short, long)]
    debug: bool,

    #[structopt(long = "cc", default_value = "clang", help = "Front-end compiler")]
    compiler: String,

    #[structopt(
        long = "cflag",
        number_of_values = 1,
        allow_hyphen_values = true,
        help = "Extra compiler argument (repeatable)"
    )]
    cflags: Vec<String>,

    #[structopt(long, default_value = "log_function_entry", help = "Logging function to call")]
    callee: String,

    #[structopt(
        long,
        number_of_values = 1,
        help = "Function never to instrument (repeatable)"
    )]
    exclude: Vec<String>,

    #[structopt(long, help = "Insert the call ahead of entry-block allocas")]
    before_allocas: bool,

    #[structopt(
        long,
        default_value = "auto",
        possible_values = &["auto", "opaque", "typed"],
        help = "Pointer spelling for inserted IR"
    )]
    pointer_style: String,

    #[structopt(long, help = "Directory for the intermediate IR file")]
    temp_dir: Option<PathBuf>,

    #[structopt(help = "Source file (or .ll file) to instrument")]
    input: PathBuf,

    #[structopt(help = "Where to write the instrumented IR")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let opts = Options::from_args();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if opts.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();
    debug!("{:?}", opts);

    let pointer_style = match opts.pointer_style.as_str() {
        "auto" => None,
        style => Some(style.parse::<PointerStyle>().map_err(anyhow::Error::msg)?),
    };
    let input = opts.input;
    let output = opts.output;
    let pipeline_opts = PipelineOptions {
        compiler: opts.compiler,
        compiler_args: opts.cflags,
        temp_dir: opts.temp_dir,
        pointer_style,
        trace: EntryTraceOptions {
            callee: opts.callee,
            exclude: opts.exclude,
            prefix: PrefixPolicy {
                allocas: !opts.before_allocas,
            },
        },
    };

    let outcome = pipeline::run(&input, &output, &pipeline_opts)
        .with_context(|| format!("failed to instrument '{}'", input.display()))?;
    match outcome {
        Outcome::Written { instrumented } => {
            debug!("{} functions instrumented", instrumented)
        }
        Outcome::Unmodified => debug!("no output written"),
    }
    Ok(())
}
