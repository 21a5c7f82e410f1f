use lumen_core::*;
use lumen_modules::*;
use std::sync::Arc;

async fn setup(platform: PlatformKind) -> (ModuleContext, Arc<ModuleRegistry>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let (context, registry) = create_module_runtime(platform, transport.clone());
    register_builtin_modules(&registry, &context).await.unwrap();
    (context, registry, transport)
}

fn waypoint(name: &str) -> Waypoint {
    Waypoint::new(name, BlockLocation::new("world", 0, 100, 0)).with_visible(true)
}

fn decoded(transport: &RecordingTransport, player: PlayerId) -> Vec<WireMessage> {
    transport
        .sent_to(player)
        .iter()
        .map(|frame| WireMessage::decode(frame.bytes()).unwrap())
        .collect()
}

fn waypoint_names(messages: &[WireMessage]) -> Vec<String> {
    messages
        .iter()
        .map(|message| match message {
            WireMessage::DisplayWaypoint(waypoint) => waypoint.name.clone(),
            other => panic!("unexpected message {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn test_builtin_modules_register() {
    let (_context, registry, _transport) = setup(PlatformKind::Server).await;
    assert!(registry.is_enabled::<dyn WaypointModule>().await);
    assert!(registry.is_enabled::<dyn TitleModule>().await);
    assert!(registry.is_enabled::<dyn ModSettingModule>().await);

    let names: Vec<String> = registry.modules().await.iter().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["Waypoints", "Titles", "ModSettings"]);
}

#[tokio::test]
async fn test_proxy_skips_server_only_modules() {
    let (_context, registry, _transport) = setup(PlatformKind::Proxy).await;
    assert!(!registry.is_enabled::<dyn WaypointModule>().await);
    assert!(registry.is_enabled::<dyn TitleModule>().await);
    assert!(registry.is_enabled::<dyn ModSettingModule>().await);
}

#[tokio::test]
async fn test_join_replays_defaults_in_order() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let waypoints = registry.lookup::<dyn WaypointModule>().await.unwrap();
    waypoints
        .options()
        .set(&DEFAULT_WAYPOINTS, Some(vec![waypoint("A"), waypoint("B"), waypoint("C")]));

    let bystander = PlayerId::new();
    context.register_player(bystander).await;
    transport.clear();

    let player = PlayerId::new();
    context.register_player(player).await;

    assert_eq!(waypoint_names(&decoded(&transport, player)), vec!["A", "B", "C"]);
    assert!(transport.sent_to(bystander).is_empty());
}

#[tokio::test]
async fn test_join_with_empty_defaults_sends_nothing() {
    let (context, _registry, transport) = setup(PlatformKind::Server).await;

    context.register_player(PlayerId::new()).await;
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_join_with_null_defaults_sends_nothing() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let waypoints = registry.lookup::<dyn WaypointModule>().await.unwrap();
    waypoints.options().set(&DEFAULT_WAYPOINTS, None);

    context.register_player(PlayerId::new()).await;
    assert!(transport.sent().is_empty());
    assert_eq!(context.events().get_stats().await.listener_failures, 0);
}

#[tokio::test]
async fn test_join_replays_defaults_loaded_from_config() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let tree = ConfigNode::from_toml_str(
        r##"
[Waypoints]
server-handles-waypoints = true

[[Waypoints.default-waypoints]]
name = "Spawn"
color = "#FF0000"

[Waypoints.default-waypoints.location]
world = "world"
x = 0
y = 100
z = 0
"##,
    )
    .unwrap();
    let report = ConfigSynchronizer::new(Arc::clone(&registry)).load(&tree).await;
    assert!(report.is_clean());

    let player = PlayerId::new();
    context.register_player(player).await;

    let messages = decoded(&transport, player);
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        WireMessage::DisplayWaypoint(message) => {
            assert_eq!(message.name, "Spawn");
            assert_eq!(message.color, Color::RED.argb());
            assert!(!message.visible);
        }
        other => panic!("unexpected message {other:?}"),
    }
}

#[tokio::test]
async fn test_waypoint_operations_send_expected_messages() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let waypoints = registry.lookup::<dyn WaypointModule>().await.unwrap();
    let player = PlayerId::new();
    context.register_player(player).await;

    let spawn = waypoint("Spawn");
    waypoints.display_waypoint(player, &spawn).await;
    waypoints.remove_waypoint_entry(player, &spawn).await;
    waypoints.remove_waypoint(player, "Home").await;
    waypoints.reset_waypoints(player).await;

    let kinds: Vec<MessageKind> = decoded(&transport, player).iter().map(WireMessage::kind).collect();
    assert_eq!(
        kinds,
        vec![
            MessageKind::DisplayWaypoint,
            MessageKind::RemoveWaypoint,
            MessageKind::RemoveWaypoint,
            MessageKind::ResetWaypoints,
        ]
    );
}

#[tokio::test]
async fn test_titles_unicast_and_broadcast() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let titles = registry.lookup::<dyn TitleModule>().await.unwrap();
    let alice = PlayerId::new();
    let bob = PlayerId::new();
    context.register_player(alice).await;
    context.register_player(bob).await;

    let title = Title::new(TitleType::Title, "Round 2").with_scale(2.0);
    titles.display_title(alice, &title).await;
    titles.broadcast_title(&title).await;
    titles.reset_titles(bob).await;

    assert_eq!(transport.sent_to(alice).len(), 2);
    let bob_kinds: Vec<MessageKind> = decoded(&transport, bob).iter().map(WireMessage::kind).collect();
    assert_eq!(bob_kinds, vec![MessageKind::DisplayTitle, MessageKind::ResetTitles]);
}

#[tokio::test]
async fn test_invalid_title_is_dropped() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let titles = registry.lookup::<dyn TitleModule>().await.unwrap();
    let player = PlayerId::new();
    context.register_player(player).await;

    titles.display_title(player, &Title::new(TitleType::Title, "Zero").with_scale(0.0)).await;
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_mod_settings_unicast_reset_and_broadcast() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let mod_settings = registry.lookup::<dyn ModSettingModule>().await.unwrap();
    let alice = PlayerId::new();
    let bob = PlayerId::new();
    context.register_player(alice).await;
    context.register_player(bob).await;
    transport.clear();

    let settings = vec![ModSetting::new("skyblockAddons").with_enable(true).with_property("scale", 2)];
    mod_settings.send_settings(alice, &settings).await;
    mod_settings.reset_settings(alice).await;
    mod_settings.broadcast_settings(&settings).await;

    let alice_messages = decoded(&transport, alice);
    let kinds: Vec<MessageKind> = alice_messages.iter().map(WireMessage::kind).collect();
    assert_eq!(
        kinds,
        vec![MessageKind::ModSettings, MessageKind::ResetModSettings, MessageKind::ModSettings]
    );
    match &alice_messages[0] {
        WireMessage::ModSettings(message) => assert_eq!(message.settings, settings),
        other => panic!("unexpected message {other:?}"),
    }
    assert_eq!(transport.sent_to(bob).len(), 1);
}

#[tokio::test]
async fn test_reload_pushes_changed_client_options() {
    let (context, registry, transport) = setup(PlatformKind::Server).await;
    let player = PlayerId::new();
    context.register_player(player).await;
    transport.clear();

    let tree = ConfigNode::from_toml_str(
        r#"
[Waypoints]
server-handles-waypoints = true
"#,
    )
    .unwrap();
    let synchronizer = ConfigSynchronizer::new(Arc::clone(&registry));
    assert!(synchronizer.reload(&context, &tree).await.is_clean());

    let messages = decoded(&transport, player);
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        WireMessage::OverrideOptions(message) => {
            assert_eq!(message.module, "Waypoints");
            assert_eq!(
                message.options.get("server-handles-waypoints"),
                Some(&serde_json::Value::Bool(true))
            );
        }
        other => panic!("unexpected message {other:?}"),
    }

    transport.clear();
    synchronizer.reload(&context, &tree).await;
    assert!(transport.sent().is_empty());
}
