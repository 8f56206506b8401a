//! Test helpers for running CLI invocations against a scratch database.

use super::*;
use std::fs;
use tempfile::TempDir;

pub(super) const AIRPORTS_DAT: &str = "\
1,\"Goroka Airport\",\"Goroka\",\"Papua New Guinea\",\"GKA\",\"AYGA\",-6.081689834590001,145.391998291,5282,10,\"U\",\"Pacific/Port_Moresby\",\"airport\",\"OurAirports\"
599,\"Dublin Airport\",\"Dublin\",\"Ireland\",\"DUB\",\"EIDW\",53.421299,-6.27007,242,0,\"E\",\"Europe/Dublin\",\"airport\",\"OurAirports\"
7,\"Battery Park City Heliport\",\"New York\",\"United States\",\"JRA\",\"KJRA\",40.7,-74.0,0,-5,\"A\",\"America/New_York\",\"heliport\",\"OurAirports\"
";

/// Scratch directory holding a database and any source files a test writes.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        Self { _dir: dir, root }
    }

    /// Database path one directory below the root, so opening it has to
    /// create the parent.
    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("state/skyatlas.db")
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("write source file");
        path
    }
}

/// Outcome of one CLI invocation: its result and everything written to stdout.
pub(super) struct Invocation {
    pub(super) result: Result<(), CliError>,
    pub(super) output: String,
}

/// Parse `args` after the binary name and run them against `database`.
pub(super) fn invoke(database: &Utf8Path, args: &[&str]) -> Invocation {
    let mut argv = vec![
        "skyatlas".to_owned(),
        format!("--{ARG_DATABASE}"),
        database.to_string(),
    ];
    argv.extend(args.iter().map(|arg| (*arg).to_owned()));
    let mut buffer = Vec::new();
    let result = Cli::try_parse_from(argv)
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| run_with(cli, &mut buffer));
    Invocation {
        result,
        output: String::from_utf8(buffer).expect("utf-8 output"),
    }
}
