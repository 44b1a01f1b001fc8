//! Repository URL round-trip property: every supported remote form parses
//! to the same (owner, repo); non-GitHub hosts are validation errors.

use soba::errors::SobaError;
use soba::github::RepoSlug;

#[test]
fn all_github_forms_round_trip() {
    let expected = RepoSlug::new("octo", "widgets");
    let forms = [
        "octo/widgets",
        "https://github.com/octo/widgets",
        "https://github.com/octo/widgets.git",
        "git@github.com:octo/widgets",
        "git@github.com:octo/widgets.git",
        "ssh://git@github.com/octo/widgets",
        "ssh://git@github.com/octo/widgets.git",
        "ssh://git@github.com:2222/octo/widgets.git",
    ];
    for form in forms {
        assert_eq!(RepoSlug::parse(form).unwrap(), expected, "form: {form}");
    }
}

#[test]
fn dotted_and_dashed_names_survive() {
    assert_eq!(
        RepoSlug::parse("my-org/my.repo-name").unwrap(),
        RepoSlug::new("my-org", "my.repo-name")
    );
    assert_eq!(
        RepoSlug::parse("https://github.com/my-org/my.repo-name.git").unwrap(),
        RepoSlug::new("my-org", "my.repo-name")
    );
}

#[test]
fn non_github_urls_are_validation_errors() {
    let rejects = [
        "https://gitlab.com/octo/widgets",
        "git@gitlab.com:octo/widgets.git",
        "ssh://git@bitbucket.org/octo/widgets",
        "http://github.com/octo/widgets",
        "",
        "widgets",
    ];
    for input in rejects {
        let err = RepoSlug::parse(input).unwrap_err();
        assert!(
            matches!(err, SobaError::Validation { .. }),
            "input: {input}"
        );
    }
}
