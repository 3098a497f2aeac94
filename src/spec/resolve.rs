use reqwest::Url;

use crate::browser::driver::{Locator, LocatorType};
use crate::error::CaseError;
use crate::spec::spec_model::{CaseSpec, SuiteContext};

const ABSOLUTE_SCHEMES: &[&str] = &["http", "https", "file", "about", "data"];

/// True when `url` carries a browser-navigable scheme. `localhost:8080/a`
/// parses with scheme `localhost` and is therefore treated as relative.
pub fn is_absolute_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => ABSOLUTE_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}

/// Absolute URLs are returned unchanged; anything else is joined against
/// `base` with standard relative-reference rules.
pub fn normalize_url(base: Option<&str>, url: &str) -> Result<String, CaseError> {
    if is_absolute_url(url) {
        return Ok(url.to_string());
    }
    let base = base.filter(|b| !b.trim().is_empty()).ok_or_else(|| {
        CaseError::Configuration(format!("relative URL '{}' but the suite has no base URL", url))
    })?;
    let base = Url::parse(base)
        .map_err(|e| CaseError::Configuration(format!("invalid base URL '{}': {}", base, e)))?;
    // A leading `name:` would otherwise be read as a scheme by `join`
    let reference = if Url::parse(url).is_ok() {
        format!("./{}", url)
    } else {
        url.to_string()
    };
    base.join(&reference)
        .map(|joined| joined.to_string())
        .map_err(|e| CaseError::Configuration(format!("cannot join '{}' onto '{}': {}", url, base, e)))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Target URL of a case.
///
/// Precedence: the case's own URL when `url_override` is set, then the page
/// object's URL, then the case's own URL. Relative URLs are joined against
/// the suite base URL. `Ok(None)` means there is nothing to navigate to.
pub fn resolve_url(case: &CaseSpec, suite: &SuiteContext) -> Result<Option<String>, CaseError> {
    let base = suite.base_url.as_deref();
    let own = non_empty(&case.url);
    let page_object = case.page_object.as_ref().and_then(|po| non_empty(&po.url));

    let chosen = match (case.url_override, own, page_object) {
        (true, Some(url), _) => Some(url),
        (_, _, Some(url)) => Some(url),
        (_, own, None) => own,
    };

    chosen.map(|url| normalize_url(base, url)).transpose()
}

/// Element locator of a case: its own locator/type win over the page
/// object's. A locator without an explicit type is treated as CSS.
pub fn resolve_locator(case: &CaseSpec) -> Result<Locator, CaseError> {
    let page_object = case.page_object.as_ref();

    let expression = non_empty(&case.locator)
        .or_else(|| page_object.and_then(|po| non_empty(&po.locator)))
        .ok_or_else(|| {
            CaseError::Configuration(format!("case '{}' has no locator and no page-object locator", case.name))
        })?;

    let kind = case
        .locator_type
        .or_else(|| page_object.and_then(|po| po.locator_type))
        .unwrap_or(LocatorType::Css);

    Ok(Locator::new(kind, expression))
}
