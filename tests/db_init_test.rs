mod helpers;

use helpers::idea;
use sacola::app::App;
use sacola::config::SacolaConfig;
use sacola::db;
use sacola::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use sacola::ideas::{IdeaId, LocalMirror};

fn config_in(dir: &tempfile::TempDir) -> SacolaConfig {
    let mut config = SacolaConfig::default();
    config.storage.mirror_path = dir
        .path()
        .join("nested/mirror.db")
        .to_string_lossy()
        .into_owned();
    config
}

#[test]
fn open_database_creates_parent_dirs_and_migrates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a/b/mirror.db");

    let conn = db::open_database(&path).unwrap();
    assert!(path.exists());
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn mirror_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");

    {
        let mirror = LocalMirror::new(db::open_database(&path).unwrap());
        let mut with_vector = idea(7, "persisted", "body");
        with_vector.embedding = Some(vec![0.5, 0.25]);
        mirror.replace_all(&[with_vector, idea(8, "second", "body")]).unwrap();
    }

    let mirror = LocalMirror::new(db::open_database(&path).unwrap());
    let all = mirror.all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, IdeaId::Remote(7));
    assert_eq!(all[0].embedding, Some(vec![0.5, 0.25]));
}

#[test]
fn login_persists_token_and_logout_clears_everything() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    {
        let app = App::open(config.clone()).unwrap();
        app.reconciler.mirror().upsert(&idea(1, "other user", "x")).unwrap();

        app.login("  tok-abc  ").unwrap();
        assert_eq!(app.session.token().as_deref(), Some("tok-abc"));
        assert!(app.reconciler.mirror().is_empty().unwrap());
        app.reconciler.mirror().upsert(&idea(2, "mine", "y")).unwrap();
    }

    // A new process restores the stored token.
    let app = App::open(config.clone()).unwrap();
    if sacola::config::env_token().is_none() {
        assert_eq!(app.session.token().as_deref(), Some("tok-abc"));
    }
    assert_eq!(app.reconciler.mirror().len().unwrap(), 1);

    app.logout().unwrap();
    assert!(!app.session.is_authenticated());
    assert!(app.reconciler.mirror().is_empty().unwrap());
    drop(app);

    let app = App::open(config).unwrap();
    if sacola::config::env_token().is_none() {
        assert!(!app.session.is_authenticated());
    }
}

#[test]
fn blank_login_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = App::open(config_in(&dir)).unwrap();
    assert!(app.login("   ").is_err());
}
