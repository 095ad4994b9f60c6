use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use cli::{
    Args, Commands, DatasetAction, LocationsAction, OrganizationAction, TagsAction, UserAction,
};
use hdx_config::{Configuration, ConfigurationOptions};
use hdx_core::{Hdx, HdxResult};
use logging::setup_logging;
use tracing::debug;

mod access;
mod cli;
mod dataset;
mod logging;
mod lookup;
mod utils;

/// Options from the environment, overridden by those on the command line.
fn configuration_options(args: &Args) -> ConfigurationOptions {
    let mut options = ConfigurationOptions::default().with_env();
    options.user_agent = Some(args.user_agent.clone());
    if let Some(url) = &args.url {
        options.hdx_url = Some(url.clone());
    }
    if let Some(site) = &args.site {
        options.hdx_site = Some(site.clone());
    }
    if let Some(key) = &args.key {
        options.hdx_key = Some(key.clone());
    }
    if args.read_only {
        options.hdx_read_only = Some(true);
    }
    if let Some(config) = &args.config {
        options.hdx_config_yaml = Some(PathBuf::from(config));
    }
    options
}

fn handle_cli(args: Args) -> HdxResult<()> {
    let configuration = Configuration::new(configuration_options(&args))?;
    debug!("using {}", configuration.get_hdx_site_url());
    let hdx = Hdx::connect(Arc::new(configuration))?;
    let json = args.json;

    match args.command {
        Commands::Dataset {
            action,
        } => {
            match action {
                DatasetAction::Show {
                    dataset,
                } => dataset::show_dataset(&hdx, &dataset, json)?,
                DatasetAction::Search {
                    query,
                    fq,
                    rows,
                    sort,
                } => dataset::search_datasets(&hdx, &query, fq, rows, sort, json)?,
            }
        }
        Commands::Tags {
            action: TagsAction::Map {
                tags,
            },
        } => lookup::map_tags(&hdx, &tags, json)?,
        Commands::Locations {
            action: LocationsAction::Resolve {
                locations,
            },
        } => lookup::resolve_locations(&hdx, &locations, json)?,
        Commands::User {
            action: UserAction::Access {
                organization,
                permission,
            },
        } => access::check_access(&hdx, &organization, &permission, json)?,
        Commands::Organization {
            action: OrganizationAction::List,
        } => access::list_organizations(&hdx, json)?,
    }
    Ok(())
}

fn main() -> miette::Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let args = Args::parse();
    setup_logging(&args);
    if args.no_color {
        utils::disable_color();
    }

    handle_cli(args)?;
    Ok(())
}
