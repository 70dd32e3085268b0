//! The `examprep init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("examprep.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("question-banks").context("failed to create question-banks/")?;
    write_if_missing(Path::new("question-banks/example.toml"), EXAMPLE_BANK)?;

    println!("\nNext steps:");
    println!("  1. Edit examprep.toml to choose where attempts are stored");
    println!("  2. Run: examprep validate --bank question-banks/example.toml");
    println!("  3. Run: examprep submit --bank question-banks/example.toml --question kin-001 --answer 2");
    println!("  4. Run: examprep progress");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examprep configuration

default_user = "${USER}"
cache_ttl_secs = 60
# Minutes east of UTC used for daily and hourly grouping (330 = UTC+05:30).
utc_offset_minutes = 0
output_dir = "./examprep-results"
# all, first or latest
attempt_policy = "all"

[store]
type = "jsonl"
path = "./examprep-data/attempts.jsonl"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
exam_type = "JEE Main"
subject = "Physics"
chapter = "Kinematics"

[[questions]]
id = "kin-001"
kind = "single_correct"
text = "The slope of a velocity-time graph gives"
options = ["displacement", "acceleration", "speed", "jerk"]
answer_key = 2
difficulty_level = 2

[[questions]]
id = "kin-002"
kind = "multiple_correct"
text = "Which of these are scalar quantities?"
options = ["distance", "velocity", "speed", "acceleration"]
answer_key = [1, 3]
difficulty_level = 3

[[questions]]
id = "kin-003"
kind = "numerical"
text = "A ball is dropped from rest. Its speed in m/s after 2 s (g = 9.8 m/s^2) is"
answer_key = 19.6
difficulty_level = 4
"#;
