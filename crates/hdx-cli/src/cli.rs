use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// HDX site to use, eg. prod, stage or demo
    #[arg(short, long, global = true)]
    pub site: Option<String>,

    /// HDX url to use instead of a named site
    #[arg(short = 'U', long, global = true)]
    pub url: Option<String>,

    /// HDX API key
    #[arg(short, long, global = true)]
    pub key: Option<String>,

    /// Only read from HDX. No API key is needed
    #[arg(short, long, global = true)]
    pub read_only: bool,

    /// Identifier appended to the user agent
    #[arg(short = 'A', long, global = true, default_value = "hdx-cli")]
    pub user_agent: String,

    /// HDX configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Datasets
    #[command(arg_required_else_help = true)]
    Dataset {
        #[clap(subcommand)]
        action: DatasetAction,
    },

    /// Map tags to approved HDX tags
    #[command(arg_required_else_help = true)]
    Tags {
        #[clap(subcommand)]
        action: TagsAction,
    },

    /// HDX locations
    #[command(arg_required_else_help = true)]
    Locations {
        #[clap(subcommand)]
        action: LocationsAction,
    },

    /// The user owning the API key
    #[command(arg_required_else_help = true)]
    User {
        #[clap(subcommand)]
        action: UserAction,
    },

    /// Organizations
    #[command(arg_required_else_help = true)]
    Organization {
        #[clap(subcommand)]
        action: OrganizationAction,
    },
}

#[derive(Subcommand)]
pub enum DatasetAction {
    /// Show a dataset and its resources
    #[command(arg_required_else_help = true)]
    Show {
        /// Dataset id or name
        #[arg(required = true)]
        dataset: String,
    },

    /// Search datasets
    #[clap(visible_alias = "find")]
    Search {
        /// Solr query
        #[arg(default_value = "*:*")]
        query: String,

        /// Solr filter query
        #[arg(long)]
        fq: Option<String>,

        /// Maximum number of datasets
        #[arg(long, short = 'n')]
        rows: Option<usize>,

        /// Sort order, eg. "metadata_modified desc"
        #[arg(long)]
        sort: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// Show what tags map to
    #[command(arg_required_else_help = true)]
    Map {
        #[arg(required = true)]
        tags: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum LocationsAction {
    /// Resolve names or codes to HDX location codes
    #[command(arg_required_else_help = true)]
    Resolve {
        #[arg(required = true)]
        locations: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Check write access to an organization
    #[command(arg_required_else_help = true)]
    Access {
        /// Organization id or name
        #[arg(required = true)]
        organization: String,

        #[arg(long, short, default_value = "create_dataset")]
        permission: String,
    },
}

#[derive(Subcommand)]
pub enum OrganizationAction {
    /// List organization names
    #[clap(visible_alias = "ls")]
    List,
}
