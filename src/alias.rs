use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::InvalidConfiguration;
use crate::flow::{self, FlowNode};

/// Maps the address a registry has inside its network to the address callers
/// outside it use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliasPair {
    pub internal: String,
    pub external: String,
}

/// Rewrites registry URLs between their internal and external forms.
///
/// Pairs are tried in configuration order and the first matching prefix wins,
/// even when a later pair has a longer match.
#[derive(Debug, Clone, Default)]
pub struct AliasRewriter {
    aliases: Vec<AliasPair>,
}

impl AliasPair {
    pub fn new(internal: impl Into<String>, external: impl Into<String>) -> Self {
        AliasPair {
            internal: internal.into(),
            external: external.into(),
        }
    }
}

impl<I, E> From<(I, E)> for AliasPair
where
    I: Into<String>,
    E: Into<String>,
{
    fn from((internal, external): (I, E)) -> Self {
        AliasPair::new(internal, external)
    }
}

impl AliasRewriter {
    pub fn new<I>(aliases: I) -> Result<Self, InvalidConfiguration>
    where
        I: IntoIterator,
        I::Item: Into<AliasPair>,
    {
        static URL_START_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new("^https?://").unwrap());

        let aliases = aliases
            .into_iter()
            .map(Into::into)
            .map(|alias: AliasPair| {
                if URL_START_REGEX.is_match(&alias.external) {
                    Ok(alias)
                } else {
                    Err(InvalidConfiguration {
                        external: alias.external,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AliasRewriter { aliases })
    }

    pub fn aliases(&self) -> &[AliasPair] {
        &self.aliases
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn to_external(&self, url: &str) -> String {
        self.aliases
            .iter()
            .find_map(|alias| substitute(url, &alias.internal, &alias.external))
            .unwrap_or_else(|| url.to_owned())
    }

    pub fn to_internal(&self, url: &str) -> String {
        self.aliases
            .iter()
            .find_map(|alias| substitute(url, &alias.external, &alias.internal))
            .unwrap_or_else(|| url.to_owned())
    }

    pub fn externalize<N: FlowNode>(&self, tree: &mut N) {
        flow::rewrite_urls(tree, &|url: &str| {
            let external = self.to_external(url);
            if external != url {
                log::debug!("Rewrote registry url `{}` to `{}`", url, external);
            }
            external
        });
    }

    pub fn internalize<N: FlowNode>(&self, tree: &mut N) {
        flow::rewrite_urls(tree, &|url: &str| {
            let internal = self.to_internal(url);
            if internal != url {
                log::debug!("Rewrote registry url `{}` to `{}`", url, internal);
            }
            internal
        });
    }
}

fn substitute(url: &str, from: &str, to: &str) -> Option<String> {
    let rest = url.strip_prefix(from)?;
    if rest.is_empty() {
        Some(to.to_owned())
    } else {
        let mut result = String::with_capacity(to.len() + rest.len());
        result.push_str(to);
        result.push_str(rest);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::ProcessGroup;

    fn table(aliases: &[(&str, &str)]) -> AliasRewriter {
        AliasRewriter::new(aliases.iter().copied()).unwrap()
    }

    #[test]
    fn unmatched_url_is_unchanged() {
        let rewriter = table(&[("http://int/", "https://ext/")]);

        assert_eq!(rewriter.to_external("http://other/x"), "http://other/x");
        assert_eq!(rewriter.to_internal("http://int/x"), "http://int/x");
        assert_eq!(rewriter.to_external(""), "");
    }

    #[test]
    fn exact_length_match() {
        let rewriter = table(&[("http://int/", "https://ext/")]);

        assert_eq!(rewriter.to_external("http://int/"), "https://ext/");
        assert_eq!(rewriter.to_internal("https://ext/"), "http://int/");
    }

    #[test]
    fn suffix_is_preserved() {
        let rewriter = table(&[("http://int/", "https://ext/")]);

        assert_eq!(
            rewriter.to_external("http://int/path?q=1"),
            "https://ext/path?q=1"
        );
        assert_eq!(
            rewriter.to_internal("https://ext/path?q=1"),
            "http://int/path?q=1"
        );
    }

    #[test]
    fn round_trip() {
        let rewriter = table(&[
            ("http://a:18080", "https://a.example.com"),
            ("http://b:18080", "https://b.example.com"),
        ]);

        for url in &["http://a:18080/nifi-registry", "http://b:18080"] {
            assert_eq!(rewriter.to_internal(&rewriter.to_external(url)), *url);
        }
    }

    #[test]
    fn first_match_wins() {
        let rewriter = table(&[
            ("http://int", "https://short"),
            ("http://int/registry", "https://long"),
        ]);
        assert_eq!(
            rewriter.to_external("http://int/registry/x"),
            "https://short/registry/x"
        );

        let rewriter = table(&[
            ("http://int/registry", "https://long"),
            ("http://int", "https://short"),
        ]);
        assert_eq!(rewriter.to_external("http://int/registry/x"), "https://long/x");
        assert_eq!(rewriter.to_external("http://int/other"), "https://short/other");
    }

    #[test]
    fn first_match_wins_on_external_prefix() {
        let rewriter = table(&[
            ("http://one", "https://ext"),
            ("http://two", "https://ext/two"),
        ]);
        assert_eq!(rewriter.to_internal("https://ext/two/x"), "http://one/two/x");
    }

    #[test]
    fn empty_table_is_identity() {
        let rewriter = AliasRewriter::new(Vec::<AliasPair>::new()).unwrap();
        assert!(rewriter.is_empty());

        for url in &["", "http://int/", "https://ext/path", "not a url"] {
            assert_eq!(rewriter.to_external(url), *url);
            assert_eq!(rewriter.to_internal(url), *url);
        }
    }

    #[test]
    fn rejects_external_without_http_scheme() {
        let err = AliasRewriter::new(vec![
            ("http://int/", "https://ext/"),
            ("http://int2/", "ftp://foo"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            InvalidConfiguration {
                external: "ftp://foo".to_owned()
            }
        );

        assert!(AliasRewriter::new(vec![("http://int/", "HTTPS://ext/")]).is_err());
        assert!(AliasRewriter::new(vec![("http://int/", "registry:18080")]).is_err());
    }

    #[test]
    fn internal_prefix_is_not_checked() {
        let rewriter = table(&[("registry:18080", "http://registry.example.com")]);
        assert_eq!(rewriter.aliases()[0].internal, "registry:18080");
    }

    #[test]
    fn externalize_rewrites_every_depth() {
        // depth 0 and 1 carry coordinates, depth 2 does not, depth 3 does
        let mut depth_two = ProcessGroup::default();
        depth_two.push_group(ProcessGroup::with_coordinates("http://int/three"));

        let mut depth_one = ProcessGroup::with_coordinates("http://int/one");
        depth_one.push_group(depth_two);
        depth_one.push_group(ProcessGroup::default());

        let mut root = ProcessGroup::with_coordinates("http://int/");
        root.push_group(depth_one);

        let rewriter = table(&[("http://int/", "https://ext/")]);
        rewriter.externalize(&mut root);

        assert_eq!(root.registry_url(), Some("https://ext/"));
        let depth_one = &root.process_groups()[0];
        assert_eq!(depth_one.registry_url(), Some("https://ext/one"));
        assert_eq!(depth_one.process_groups()[1], ProcessGroup::default());
        let depth_two = &depth_one.process_groups()[0];
        assert_eq!(depth_two.registry_url(), None);
        assert_eq!(depth_two.process_groups().len(), 1);
        assert_eq!(
            depth_two.process_groups()[0].registry_url(),
            Some("https://ext/three")
        );

        rewriter.internalize(&mut root);
        assert_eq!(root.registry_url(), Some("http://int/"));
        assert_eq!(
            root.process_groups()[0].process_groups()[0].process_groups()[0].registry_url(),
            Some("http://int/three")
        );
    }

    #[test]
    fn externalize_without_coordinates_is_noop() {
        let mut root = ProcessGroup::default();
        root.push_group(ProcessGroup::default());
        let expected = root.clone();

        table(&[("http://int/", "https://ext/")]).externalize(&mut root);
        assert_eq!(root, expected);
    }
}
