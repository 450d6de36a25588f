//! Shared constants used across SceneTree crates.

/// Display name of the tree root.
pub const ROOT_NAME: &str = "game";

/// Default cap on recorded history entries.
pub const DEFAULT_HISTORY_LIMIT: usize = 512;

/// Service whose scripts are executed by a run unless configured otherwise.
pub const DEFAULT_SCRIPT_SERVICE: &str = "ServerScriptService";

/// Prefix for source text seeded into newly added scripts.
pub const NEW_SCRIPT_SOURCE_PREFIX: &str = "-- Hello from ";

/// Placeholder shown by editors when no buffer is active.
pub const NO_SCRIPT_OPEN_TEXT: &str = "-- No script is open --";

/// Sample scripts seeded into the script service of a fresh session.
pub const SAMPLE_SCRIPTS: &[(&str, &str)] = &[
    ("01_Basics", "-- Basics\nprint(\"Hello, world!\")"),
    (
        "02_FindingParts",
        "-- Finding parts\nlocal part = game.Workspace.Part1\nprint(part)",
    ),
    (
        "03_ChangingParts",
        "-- Changing parts\nlocal part = game.Workspace.Part1\npart.Name = \"Renamed\"",
    ),
    (
        "04_LoopsAndCreation",
        "-- Loops and creation\nfor i = 1, 3 do\n    print(i)\nend",
    ),
];
