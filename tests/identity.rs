// ABOUTME: Property tests for build identity derivation.
// ABOUTME: Version tags are deterministic and unique per commit and build number.

use proptest::prelude::*;
use shipline::pipeline::{BuildIdentity, SHORT_COMMIT_LEN};
use shipline::types::ImageRef;

fn repository() -> ImageRef {
    ImageRef::from_parts("registry.example.com", "team/app", "latest").unwrap()
}

#[test]
fn known_identity() {
    let identity = BuildIdentity::new("abc1234", 42, &repository()).unwrap();
    assert_eq!(identity.version_tag(), "abc1234-42");
    assert_eq!(
        identity.full_image_ref().to_string(),
        "registry.example.com/team/app:abc1234-42"
    );
}

proptest! {
    #[test]
    fn tag_has_short_commit_and_build(commit in "[0-9a-f]{40}", build in any::<u64>()) {
        let identity = BuildIdentity::new(&commit, build, &repository()).unwrap();
        prop_assert_eq!(
            identity.version_tag(),
            format!("{}-{}", &commit[..SHORT_COMMIT_LEN], build)
        );
        prop_assert_eq!(identity.full_image_ref().tag(), Some(identity.version_tag()));
        prop_assert_eq!(identity.latest_image_ref().tag(), Some("latest"));
    }

    #[test]
    fn distinct_builds_get_distinct_tags(
        commit in "[0-9a-f]{7}",
        a in any::<u64>(),
        b in any::<u64>(),
    ) {
        prop_assume!(a != b);
        let first = BuildIdentity::new(&commit, a, &repository()).unwrap();
        let second = BuildIdentity::new(&commit, b, &repository()).unwrap();
        prop_assert_ne!(first.version_tag(), second.version_tag());
    }

    #[test]
    fn distinct_commits_get_distinct_tags(
        a in "[0-9a-f]{7}",
        b in "[0-9a-f]{7}",
        build in any::<u64>(),
    ) {
        prop_assume!(a != b);
        let first = BuildIdentity::new(&a, build, &repository()).unwrap();
        let second = BuildIdentity::new(&b, build, &repository()).unwrap();
        prop_assert_ne!(first.version_tag(), second.version_tag());
    }

    #[test]
    fn case_does_not_change_identity(commit in "[0-9a-f]{7}", build in any::<u64>()) {
        let lower = BuildIdentity::new(&commit, build, &repository()).unwrap();
        let upper = BuildIdentity::new(&commit.to_uppercase(), build, &repository()).unwrap();
        prop_assert_eq!(lower, upper);
    }
}
