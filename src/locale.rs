//! Locale fallback chains.

/// Returns the primary language subtag (`"pt"` for `"pt-BR"`).
#[must_use]
pub fn primary_subtag(locale: &str) -> &str {
    locale.split_once('-').map_or(locale, |(primary, _)| primary)
}

/// Resolves the fallback chain for `requested`, most specific first.
///
/// The chain is never empty, always ends with `default_locale` and has no duplicates.
/// Intermediate script subtags are not expanded: `zh-Hant-TW` falls back to `zh` directly.
///
/// # Examples
/// ```
/// use i18n_runtime::locale::resolve_locale_chain;
///
/// assert_eq!(resolve_locale_chain("pt-BR", "en"), vec!["pt-BR", "pt", "en"]);
/// assert_eq!(resolve_locale_chain("en-GB", "en"), vec!["en-GB", "en"]);
/// assert_eq!(resolve_locale_chain("en", "en"), vec!["en"]);
/// ```
#[must_use]
pub fn resolve_locale_chain(requested: &str, default_locale: &str) -> Vec<String> {
    if requested.is_empty() || requested == default_locale {
        return vec![default_locale.to_string()];
    }

    let mut chain = vec![requested.to_string()];
    let primary = primary_subtag(requested);
    if primary != requested && primary != default_locale {
        chain.push(primary.to_string());
    }
    chain.push(default_locale.to_string());
    chain
}

/// Picks the locale to serve for `requested`.
///
/// Without an allow-list the requested locale is served as-is. With one, the requested
/// locale wins if listed, then its primary subtag, then `default_locale`. A listed match
/// is returned with the allow-list's spelling.
#[must_use]
pub fn negotiate_locale(
    requested: &str,
    supported: Option<&[String]>,
    default_locale: &str,
) -> String {
    let Some(supported) = supported else {
        return requested.to_string();
    };

    // 一覧側の表記を返す
    let find_supported = |code: &str| supported.iter().find(|s| s.eq_ignore_ascii_case(code));
    if let Some(listed) = find_supported(requested) {
        return listed.clone();
    }

    if let Some(listed) = find_supported(primary_subtag(requested)) {
        tracing::debug!(requested, negotiated = %listed, "Falling back to primary subtag");
        return listed.clone();
    }

    tracing::debug!(requested, negotiated = default_locale, "Unsupported locale requested");
    default_locale.to_string()
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::same_as_default("en", "en", &["en"])]
    #[case::region_of_default("en-GB", "en", &["en-GB", "en"])]
    #[case::region("pt-BR", "en", &["pt-BR", "pt", "en"])]
    #[case::language_only("fr", "en", &["fr", "en"])]
    #[case::script_and_region("zh-Hant-TW", "en", &["zh-Hant-TW", "zh", "en"])]
    #[case::regional_default("en", "en-US", &["en", "en-US"])]
    #[case::empty_request("", "en", &["en"])]
    fn test_resolve_locale_chain(
        #[case] requested: &str,
        #[case] default_locale: &str,
        #[case] expected: &[&str],
    ) {
        let chain = resolve_locale_chain(requested, default_locale);

        assert_that!(chain, eq(&expected.iter().map(ToString::to_string).collect::<Vec<_>>()));
    }

    #[rstest]
    #[case("pt-BR", "en")]
    #[case("de-AT", "de")]
    #[case("sr-Latn-RS", "en")]
    #[case("en", "en")]
    fn chain_ends_with_default_and_has_no_duplicates(
        #[case] requested: &str,
        #[case] default_locale: &str,
    ) {
        let chain = resolve_locale_chain(requested, default_locale);

        assert_that!(chain.last().map(String::as_str), some(eq(default_locale)));
        let mut deduped = chain.clone();
        deduped.sort();
        deduped.dedup();
        assert_that!(deduped.len(), eq(chain.len()));
    }

    #[rstest]
    #[case::no_allow_list("pt-BR", None, "pt-BR")]
    #[case::listed("pt-BR", Some(&["en", "pt-BR"][..]), "pt-BR")]
    #[case::case_insensitive("pt-br", Some(&["en", "pt-BR"][..]), "pt-BR")]
    #[case::primary_case_insensitive("PT-br", Some(&["en", "pt"][..]), "pt")]
    #[case::primary_listed("pt-BR", Some(&["en", "pt"][..]), "pt")]
    #[case::unlisted("pt-BR", Some(&["en", "ja"][..]), "en")]
    fn test_negotiate_locale(
        #[case] requested: &str,
        #[case] supported: Option<&[&str]>,
        #[case] expected: &str,
    ) {
        let supported =
            supported.map(|codes| codes.iter().map(ToString::to_string).collect::<Vec<_>>());

        let negotiated = negotiate_locale(requested, supported.as_deref(), "en");

        assert_that!(negotiated, eq(expected));
    }

    #[rstest]
    #[case("pt-BR", "pt")]
    #[case("zh-Hant-TW", "zh")]
    #[case("en", "en")]
    fn test_primary_subtag(#[case] locale: &str, #[case] expected: &str) {
        assert_that!(primary_subtag(locale), eq(expected));
    }
}
