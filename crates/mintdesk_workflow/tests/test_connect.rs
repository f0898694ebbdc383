use mintdesk_chain::Cluster;
use mintdesk_core::MintdeskConfig;
use solana_sdk::signature::{Keypair, write_keypair_file};

#[test]
fn connect_without_keypair_is_disconnected() {
    let workflow = mintdesk_workflow::connect(&MintdeskConfig::default()).unwrap();
    assert!(!workflow.wallet_connected());
    assert_eq!(workflow.settings().cluster, Cluster::Devnet);
}

#[test]
fn connect_loads_keypair_and_cluster() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("id.json");
    write_keypair_file(&Keypair::new(), &path).unwrap();

    let config = MintdeskConfig {
        cluster: "localnet".into(),
        keypair_path: Some(path),
        confirm_timeout_secs: 5,
        ..Default::default()
    };
    let workflow = mintdesk_workflow::connect(&config).unwrap();
    assert!(workflow.wallet_connected());
    assert_eq!(workflow.settings().cluster, Cluster::Localnet);
    assert_eq!(workflow.settings().confirm_timeout.as_secs(), 5);
}

#[test]
fn connect_rejects_bad_config() {
    let bad_url = MintdeskConfig {
        rpc_url: Some("not a url".into()),
        ..Default::default()
    };
    assert!(mintdesk_workflow::connect(&bad_url).is_err());

    let tmp = tempfile::tempdir().unwrap();
    let missing_key = MintdeskConfig {
        keypair_path: Some(tmp.path().join("missing.json")),
        ..Default::default()
    };
    assert!(mintdesk_workflow::connect(&missing_key).is_err());
}
