//! Tests for command-line parsing.

use clap::Parser;
use clap::error::ErrorKind;

use super::{Cli, Commands, target};
use crate::cli::commands::Target;
use crate::cli::error::CliError;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("showroom-db").chain(args.iter().copied()))
}

#[test]
fn delete_requires_a_target() {
    let err = parse(&["delete", "cars"]).err().expect("bare delete must not parse");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn update_requires_a_target() {
    let err = parse(&["update", "cars", r#"{"price": 1}"#])
        .err()
        .expect("bare update must not parse");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn id_and_filter_are_exclusive() {
    let err = parse(&["delete", "cars", "--id", "abc", "--filter", "{}"])
        .err()
        .expect("both targets must not parse");
    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
}

#[test]
fn explicit_targets_parse() {
    let cli = parse(&["delete", "cars", "--filter", "{}"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Delete { id: None, filter: Some(ref f), .. } if f == "{}"
    ));

    let cli = parse(&["update", "cars", r#"{"price": 1}"#, "--id", "abc"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Update { id: Some(ref id), filter: None, .. } if id == "abc"
    ));
}

#[test]
fn target_needs_exactly_one_selector() {
    assert!(matches!(target(Some("abc"), None), Ok(Target::Id("abc"))));
    assert!(matches!(target(None, Some("{}")), Ok(Target::Filter("{}"))));
    assert!(matches!(
        target(None, None),
        Err(CliError::InvalidArgument { .. })
    ));
}
