//! End-to-end: config file → big bang → bot → JSON lines.

use rand::rngs::StdRng;
use rand::SeedableRng;

use sectorwars_bot::{load_config, serve, Bot};
use sectorwars_core::generation::BigBang;
use sectorwars_core::persistence::PersistenceEngine;
use sectorwars_core::{Reply, SectorwarsConfig};

#[test]
fn bot_from_config_plays_a_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("game.db");
    let config_path = dir.path().join("sectorwars.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[game.clusters]
count = 1
size = 3

[game.sectors.connections.ratios]
one = 1.0
two = 1.0

[persistence]
path = "{}"

[[profiles]]
id = "U7"
first_name = "Grace"
last_name = "Hopper"
display_name = "grace"
"#,
            db_path.display().to_string().replace('\\', "/")
        ),
    )
    .expect("write config");

    let config = load_config(Some(&config_path)).expect("config");
    {
        let engine =
            PersistenceEngine::open(&config.persistence.path, &config.persistence).expect("open");
        BigBang::new(&engine)
            .run(&config.game, false, &mut StdRng::seed_from_u64(4))
            .expect("big bang");
    }

    let bot = Bot::from_config(&config).expect("bot");
    // Ratios of 1.0 never fire the extra or loop lanes: the cluster is a
    // plain two-way chain, so the spawn sector warps only to its successor.
    let next = bot.with_session(|s| {
        let spawn = s.graph().index_of(s.universe().spawn_sector().expect("spawn")).expect("idx");
        let next = s.graph().neighbors(spawn)[0];
        s.sector_at(next).expect("sector").number
    });

    let input = [
        r#"{"sender":"U7","kind":"direct_message","text":"register"}"#.to_string(),
        format!(r#"{{"sender":"U7","kind":"direct_message","text":"move {next}"}}"#),
        r#"{"sender":"U7","kind":"direct_mention","text":"status"}"#.to_string(),
    ]
    .join("\n");
    let mut output = Vec::new();
    let stats = serve(&bot, input.as_bytes(), &mut output).expect("serve");
    assert_eq!(stats.events, 3);

    let replies: Vec<Vec<Reply>> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json"))
        .collect();
    assert!(replies[0][0].text.contains("Grace Hopper"));
    assert!(replies[1][0].text.starts_with(&format!("You have arrived in *Sector {next}*")));
    assert_eq!(
        replies[2],
        vec![Reply::private("The *status* command can only be run in a direct message")]
    );
}

#[test]
fn bot_refuses_a_corrupted_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = SectorwarsConfig::default();
    config.persistence.path = dir.path().join("game.db").display().to_string();
    {
        let engine =
            PersistenceEngine::open(&config.persistence.path, &config.persistence).expect("open");
        BigBang::new(&engine)
            .run(&config.game, false, &mut StdRng::seed_from_u64(9))
            .expect("big bang");
    }
    Bot::from_config(&config).expect("intact database loads");

    {
        let conn = rusqlite::Connection::open(&config.persistence.path).expect("raw open");
        conn.execute_batch(
            "CREATE TABLE scratch (x TEXT);
             CREATE INDEX scratch_x ON scratch (x);
             INSERT INTO scratch VALUES ('a'), ('b'), ('c');
             PRAGMA writable_schema = ON;
             DELETE FROM sqlite_master WHERE name = 'scratch_x';
             PRAGMA writable_schema = OFF;",
        )
        .expect("orphan the index");
    }

    let err = Bot::from_config(&config).expect_err("corrupted database");
    assert!(format!("{err:#}").contains("integrity check"));
}
