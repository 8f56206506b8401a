//! Behaviour-driven step definitions for the load and query commands.

use super::helpers::{AIRPORTS_DAT, Invocation, Workspace, invoke};
use super::*;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use skyatlas_core::api::{Endpoint, ResponseStatus};
use skyatlas_data::IngestError;
use std::cell::RefCell;

/// Scenario state shared by every step through a single world argument.
struct CommandWorld {
    workspace: RefCell<Option<Workspace>>,
    source: RefCell<Option<Utf8PathBuf>>,
    invocation: RefCell<Option<Invocation>>,
}

impl CommandWorld {
    fn new() -> Self {
        Self {
            workspace: RefCell::new(None),
            source: RefCell::new(None),
            invocation: RefCell::new(None),
        }
    }

    fn run(&self, args: &[&str]) {
        let workspace = self.workspace.borrow();
        let database = workspace.as_ref().expect("database prepared").database();
        *self.invocation.borrow_mut() = Some(invoke(&database, args));
    }

    fn source(&self) -> Utf8PathBuf {
        self.source.borrow().clone().expect("source file prepared")
    }

    fn printed_json(&self) -> Value {
        let invocation = self.invocation.borrow();
        let output = &invocation.as_ref().expect("command ran").output;
        serde_json::from_str(output).expect("json output")
    }
}

#[fixture]
fn world() -> CommandWorld {
    CommandWorld::new()
}

#[given("a fresh database")]
fn fresh_database(#[from(world)] world: &CommandWorld) {
    *world.workspace.borrow_mut() = Some(Workspace::new());
}

#[given("an airports file with two airports and a heliport")]
fn airports_file(#[from(world)] world: &CommandWorld) {
    let workspace = world.workspace.borrow();
    let path = workspace
        .as_ref()
        .expect("database prepared")
        .write("airports.dat", AIRPORTS_DAT);
    *world.source.borrow_mut() = Some(path);
}

#[given("the sample data has been loaded")]
fn sample_loaded(#[from(world)] world: &CommandWorld) {
    world.run(&["load-sample"]);
    let invocation = world.invocation.borrow_mut().take();
    if let Some(Invocation { result: Err(err), .. }) = invocation {
        panic!("sample load failed: {err}");
    }
}

#[when("I run load-airports on the airports file")]
fn run_load_airports(#[from(world)] world: &CommandWorld) {
    let source = world.source();
    world.run(&["load-airports", source.as_str()]);
}

#[when("I query nearest for latitude 53.3 and longitude -6.2")]
fn query_nearest(#[from(world)] world: &CommandWorld) {
    world.run(&["query", "nearest", "-p", "lat=53.3", "-p", "lon=-6.2"]);
}

#[when("I query routes from origin ZZZ")]
fn query_unknown_origin(#[from(world)] world: &CommandWorld) {
    world.run(&["query", "routes", "--param", "origin=ZZZ"]);
}

#[when("I run load-routes on a file that does not exist")]
fn run_load_missing_routes(#[from(world)] world: &CommandWorld) {
    let missing = world
        .workspace
        .borrow()
        .as_ref()
        .expect("database prepared")
        .path("routes.dat");
    world.run(&["load-routes", missing.as_str()]);
}

#[then("the command succeeds")]
fn command_succeeds(#[from(world)] world: &CommandWorld) {
    let invocation = world.invocation.borrow();
    let invocation = invocation.as_ref().expect("command ran");
    if let Err(err) = &invocation.result {
        panic!("command failed: {err}\n{}", invocation.output);
    }
}

#[then("the output reports 2 imported, 1 skipped and 2 in total")]
fn airport_summary(#[from(world)] world: &CommandWorld) {
    let invocation = world.invocation.borrow();
    let output = &invocation.as_ref().expect("command ran").output;
    for line in [
        "Imported or updated 2 airports.",
        "Skipped 1 rows.",
        "Total in DB: 2",
    ] {
        assert!(output.contains(line), "missing {line:?} in {output}");
    }
}

#[then("the first feature is DUB at 14.27 km")]
fn nearest_is_dublin(#[from(world)] world: &CommandWorld) {
    let body = world.printed_json();
    let properties = &body["features"][0]["properties"];
    assert_eq!(properties["iata_code"], "DUB");
    assert_eq!(properties["distance_km"], serde_json::json!(14.27));
}

#[then("the command fails with status 404")]
fn fails_not_found(#[from(world)] world: &CommandWorld) {
    let invocation = world.invocation.borrow();
    match &invocation.as_ref().expect("command ran").result {
        Err(CliError::QueryFailed { endpoint, status }) => {
            assert_eq!(*endpoint, Endpoint::Routes);
            assert_eq!(*status, ResponseStatus::NotFound);
            assert_eq!(status.http_status(), 404);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[then("the printed body carries an error message")]
fn body_has_error(#[from(world)] world: &CommandWorld) {
    let body = world.printed_json();
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("ZZZ"), "{message}");
}

#[then("the command reports the missing file")]
fn reports_missing_file(#[from(world)] world: &CommandWorld) {
    let invocation = world.invocation.borrow();
    match &invocation.as_ref().expect("command ran").result {
        Err(CliError::Ingest {
            source: IngestError::MissingFile { path },
            ..
        }) => assert_eq!(path.file_name(), Some("routes.dat")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

macro_rules! register_command_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/commands.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CommandWorld) {
            let _ = world;
        }
    };
}

register_command_scenario!(loading_airports, "loading airports prints the import summary");
register_command_scenario!(nearest_airport, "finding the nearest airport to a point");
register_command_scenario!(unknown_origin, "querying routes from an unknown origin");
register_command_scenario!(missing_routes_file, "loading routes from a missing file");
