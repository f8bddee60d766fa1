use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fn_error_context::context;
use serde::Deserialize;
use structopt::StructOpt;

use crate::alias::{AliasPair, AliasRewriter};

#[derive(Debug, StructOpt)]
pub struct Options {
    #[structopt(
        long,
        short = "a",
        value_name = "ALIAS_FILE",
        help = "Path to the registry alias file (.xml or .yaml) [default: no aliases]",
        parse(from_os_str)
    )]
    aliases: Option<PathBuf>,
}

pub fn parse(options: &Options) -> Result<Config> {
    match &options.aliases {
        Some(path) if path.exists() => parse_file(path),
        Some(path) => {
            log::info!(
                "Alias file `{}` does not exist, no aliases configured",
                path.display()
            );
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

#[context("failed to parse aliases from `{}`", path.display())]
pub fn parse_file(path: &Path) -> Result<Config> {
    let reader = BufReader::new(File::open(path)?);
    let config = match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("xml") => from_xml_reader(reader)?,
        _ => serde_yaml::from_reader(reader)?,
    };
    config.validate()?;
    log::debug!(
        "Loaded {} alias(es) from `{}`",
        config.aliases.len(),
        path.display()
    );
    Ok(config)
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aliases: Vec<AliasPair>,
}

/// `<aliases><alias>...</alias>...</aliases>`, where each alias carries
/// `internal` and `external` either as child elements or as attributes.
#[derive(Debug, Deserialize)]
struct XmlAliases {
    #[serde(rename = "alias", default)]
    aliases: Vec<XmlAlias>,
}

#[derive(Debug, Deserialize)]
struct XmlAlias {
    #[serde(alias = "@internal")]
    internal: String,
    #[serde(alias = "@external")]
    external: String,
}

pub fn from_xml_reader<R: Read>(reader: R) -> Result<Config> {
    let xml: XmlAliases = serde_xml_rs::from_reader(reader)?;
    let aliases = xml
        .aliases
        .into_iter()
        .map(|alias| AliasPair::new(alias.internal, alias.external))
        .collect();
    Ok(Config { aliases })
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for (index, alias) in self.aliases.iter().enumerate() {
            if alias.internal.is_empty() {
                bail!(
                    "alias {} (external `{}`) has an empty internal prefix",
                    index,
                    alias.external
                );
            }
        }
        Ok(())
    }

    pub fn into_rewriter(self) -> Result<AliasRewriter> {
        AliasRewriter::new(self.aliases).context("invalid registry alias configuration")
    }
}
