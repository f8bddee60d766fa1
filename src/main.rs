use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use fn_error_context::context;
use serde::Serialize;
use structopt::StructOpt;

use registry_alias::{config, FlowSnapshot, ProcessGroup};

const ABOUT: &str =
    "Rewrites registry URLs in versioned flows between internal and external aliases.";

#[derive(Debug, StructOpt)]
#[structopt(about = ABOUT)]
#[structopt(setting = structopt::clap::AppSettings::UnifiedHelpMessage)]
pub struct Options {
    #[structopt(flatten)]
    config: config::Options,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(about = "Replace internal registry URLs in a flow with their external aliases")]
    Externalize(FlowOptions),
    #[structopt(about = "Replace external registry URLs in a flow with their internal addresses")]
    Internalize(FlowOptions),
    #[structopt(about = "Print the external alias of a URL")]
    ToExternal {
        #[structopt(value_name = "URL")]
        url: String,
    },
    #[structopt(about = "Print the internal address of a URL")]
    ToInternal {
        #[structopt(value_name = "URL")]
        url: String,
    },
}

#[derive(Debug, StructOpt)]
struct FlowOptions {
    #[structopt(
        value_name = "FLOW_FILE",
        help = "Path to a JSON flow snapshot [default: stdin]",
        parse(from_os_str)
    )]
    input: Option<PathBuf>,
    #[structopt(
        long,
        help = "Treat the input as a bare process group instead of a flow snapshot"
    )]
    bare_group: bool,
    #[structopt(long, help = "Pretty-print the rewritten flow")]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().filter_or("REGISTRY_ALIAS_LOG", "info"));
    let options = Options::from_args();
    log::debug!("{:#?}", options);

    let rewriter = config::parse(&options.config)?.into_rewriter()?;
    if rewriter.is_empty() {
        log::info!("No registry aliases configured, URLs will pass through unchanged");
    }

    match &options.command {
        Command::Externalize(flow) => flow.run(|group| rewriter.externalize(group)),
        Command::Internalize(flow) => flow.run(|group| rewriter.internalize(group)),
        Command::ToExternal { url } => {
            println!("{}", rewriter.to_external(url));
            Ok(())
        }
        Command::ToInternal { url } => {
            println!("{}", rewriter.to_internal(url));
            Ok(())
        }
    }
}

impl FlowOptions {
    fn run(&self, rewrite: impl Fn(&mut ProcessGroup)) -> Result<()> {
        let input = self.read_input()?;

        let output = if self.bare_group {
            let mut group: ProcessGroup = serde_json::from_slice(&input)
                .with_context(|| format!("failed to parse process group from {}", self.name()))?;
            rewrite(&mut group);
            self.to_json(&group)?
        } else {
            let mut snapshot: FlowSnapshot = serde_json::from_slice(&input)
                .with_context(|| format!("failed to parse flow snapshot from {}", self.name()))?;
            rewrite(snapshot.flow_contents_mut());
            self.to_json(&snapshot)?
        };

        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        stdout.write_all(&output)?;
        writeln!(stdout)?;
        Ok(())
    }

    #[context("failed to read flow from {}", self.name())]
    fn read_input(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match &self.input {
            Some(path) => BufReader::new(File::open(path)?).read_to_end(&mut buf)?,
            None => io::stdin().read_to_end(&mut buf)?,
        };
        Ok(buf)
    }

    fn to_json<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .context("failed to write rewritten flow")
    }

    fn name(&self) -> Cow<'static, str> {
        match &self.input {
            Some(path) => Cow::Owned(format!("`{}`", path.display())),
            None => Cow::Borrowed("stdin"),
        }
    }
}
