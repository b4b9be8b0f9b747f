use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "facetsearch",
    version,
    about = "faceted search session client",
    long_about = "facetsearch drives a paginated, faceted search session against a remote search endpoint.\n\nExamples:\n  facetsearch -U https://host/api/v1/search/ -q 'repro*'\n  facetsearch -U https://host/api/v1/search/ --loc '?q=brian&filter=project&page=2'\n  facetsearch -q brian --tag psychology --interactive\n\nTip: Use --config to persist the endpoint and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the last rendered page to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (text or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.facetsearch/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'U',
        long = "qu",
        visible_alias = "query-url",
        value_name = "URL",
        help_heading = "Endpoint",
        help = "Search endpoint URL."
    )]
    pub query_url: Option<String>,

    #[arg(
        long = "au",
        visible_alias = "app-url",
        value_name = "URL",
        help_heading = "Endpoint",
        help = "Application root URL used by the claim action."
    )]
    pub app_url: Option<String>,

    #[arg(
        short = 'q',
        long = "q",
        visible_alias = "query",
        value_name = "TEXT",
        help_heading = "Search",
        help = "Free-text query."
    )]
    pub query: Option<String>,

    #[arg(
        short = 'f',
        long = "flt",
        visible_alias = "filter",
        value_name = "ALIAS",
        help_heading = "Search",
        help = "Category filter alias (e.g. project, user)."
    )]
    pub filter: Option<String>,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Search",
        help = "Page to open (1-based)."
    )]
    pub page: Option<u32>,

    #[arg(
        short = 'L',
        long = "loc",
        visible_alias = "location",
        value_name = "QUERY_STRING",
        help_heading = "Search",
        help = "Open a deep link such as '?q=brian&filter=project&page=2' (overrides --query/--filter/--page)."
    )]
    pub location: Option<String>,

    #[arg(
        short = 'g',
        long = "tg",
        visible_alias = "tag",
        value_name = "TAG",
        action = ArgAction::Append,
        help_heading = "Search",
        help = "Narrow the query by a tag after the first search (repeatable)."
    )]
    pub tag: Vec<String>,

    #[arg(
        short = 's',
        long = "sz",
        visible_alias = "size",
        value_name = "N",
        help_heading = "Search",
        help = "Results per page."
    )]
    pub size: Option<u32>,

    #[arg(
        short = 'i',
        long = "it",
        visible_alias = "interactive",
        help_heading = "Search",
        help = "Keep the session open and read commands from stdin."
    )]
    pub interactive: bool,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'x',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'H',
        long = "hdr",
        visible_alias = "header",
        value_name = "HEADER",
        help_heading = "HTTP",
        help = "Add a header to all requests (format: 'Key: Value')."
    )]
    pub header: Option<String>,
}
