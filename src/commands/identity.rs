// ABOUTME: Identity command implementation.
// ABOUTME: Prints the version tag for a commit and build number, plus image refs when configured.

use serde::Serialize;
use shipline::config::Config;
use shipline::error::Result;
use shipline::output::Output;
use shipline::pipeline::{BuildIdentity, short_commit, version_tag};

#[derive(Serialize)]
struct VersionTag {
    commit_short: String,
    build_number: u64,
    version_tag: String,
}

pub fn identity(
    config: Option<&Config>,
    commit: &str,
    build_number: u64,
    output: &Output,
) -> Result<()> {
    let Some(config) = config else {
        let commit_short = short_commit(commit)?;
        let tag = version_tag(&commit_short, build_number);
        let lines = vec![tag.clone()];
        output.value(
            &VersionTag {
                commit_short,
                build_number,
                version_tag: tag,
            },
            &lines,
        );
        return Ok(());
    };

    let identity = BuildIdentity::new(commit, build_number, &config.base_image()?)?;
    let lines = vec![
        identity.version_tag().to_string(),
        format!("image:  {}", identity.full_image_ref()),
        format!("latest: {}", identity.latest_image_ref()),
    ];
    output.value(&identity, &lines);
    Ok(())
}
