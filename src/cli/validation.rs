use crate::cli::args::CliArgs;
use crate::navigation::NavigationSnapshot;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(size) = args.size {
        if size == 0 {
            return Err("invalid size, expected positive integer".to_string());
        }
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid page, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.location.as_deref() {
        NavigationSnapshot::from_location(raw)
            .map_err(|e| format!("invalid --location '{raw}': {e}"))?;
    }
    if let Some(raw) = args.header.as_deref() {
        crate::backend::parse_header(raw).map_err(|e| format!("invalid --header: {e}"))?;
    }
    if let Some(raw) = args.query_url.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --query-url '{raw}': {e}"))?;
    }
    if let Some(raw) = args.app_url.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --app-url '{raw}': {e}"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --output-format '{raw}', expected text or json"));
        }
    }
    if args.tag.iter().any(|t| t.trim().is_empty()) {
        return Err("invalid --tag, expected non-empty name".to_string());
    }
    Ok(())
}
