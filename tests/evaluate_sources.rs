//! Source evaluation against NuGet.Config files

mod helper;

use tempfile::TempDir;

use helper::write_config;
use latest_version::evaluate_sources;
use latest_version::source::Source;
use latest_version::version::error::ConfigError;

const CONTOSO_CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
    <packageSources>
        <add key="Contoso" value="https://contoso.org/v3/index.json" />
        <add key="b" value="b" />
    </packageSources>
    <packageSourceCredentials>
        <Contoso>
            <add key="Username" value="user@contoso.com" />
            <add key="Password" value="..." />
        </Contoso>
    </packageSourceCredentials>
</configuration>"#;

#[test]
fn requested_sources_pick_up_configured_credentials() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("NuGet.Config");
    std::fs::write(&path, CONTOSO_CONFIG).unwrap();

    let result = evaluate_sources(
        &[
            Source::new("https://contoso.org/v3/index.json"),
            Source::new("b"),
        ],
        &[path],
    )
    .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].name(), "Contoso");
    let credentials = result[0].credentials().unwrap();
    assert_eq!(credentials.username, "user@contoso.com");
    assert_eq!(credentials.password, "...");
    assert_eq!(result[1].name(), "b");
    assert!(result[1].credentials().is_none());
}

#[test]
fn unknown_sources_pass_through_in_order() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "NuGet.Config",
        &[("nuget.org", "https://api.nuget.org/v3/index.json")],
    );
    let requested = vec![
        Source::new("/srv/packages"),
        Source::new("https://api.nuget.org/v3/index.json"),
        Source::new("/srv/packages"),
    ];

    let result = evaluate_sources(&requested, &[path]).unwrap();

    let uris: Vec<&str> = result.iter().map(|s| s.uri()).collect();
    assert_eq!(
        uris,
        vec![
            "/srv/packages",
            "https://api.nuget.org/v3/index.json",
            "/srv/packages"
        ]
    );
    assert_eq!(result[0].name(), "/srv/packages");
    assert_eq!(result[1].name(), "nuget.org");
}

#[test]
fn later_config_file_renames_source() {
    let dir = TempDir::new().unwrap();
    let user = write_config(
        dir.path(),
        "user.config",
        &[("feed", "https://feed/index.json")],
    );
    let local = write_config(
        dir.path(),
        "local.config",
        &[("team-feed", "https://feed/index.json")],
    );

    let result =
        evaluate_sources(&[Source::new("https://feed/index.json")], &[user, local]).unwrap();

    assert_eq!(result[0].name(), "team-feed");
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();

    let result = evaluate_sources(
        &[Source::new("https://feed/index.json")],
        &[dir.path().join("missing.config")],
    );

    assert!(matches!(result, Err(ConfigError::Read { .. })));
}
