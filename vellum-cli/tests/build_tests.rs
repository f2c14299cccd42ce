use std::fs;
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/App.vue")
}

fn out_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../target/vellum-cli-tests")
        .join(format!("{}-{name}", std::process::id()))
}

#[test]
fn cli_build_emits_entry_render_and_styles() {
    let out = out_dir("build");
    let options = vellum_cli::load_options(None, false, false).unwrap();
    let written = vellum_cli::build_cmd(&[fixture()], Some(out.as_path()), &options).expect("build");
    assert_eq!(written.len(), 5);

    let entry = fs::read_to_string(out.join("App.entry.js")).expect("entry");
    assert!(entry.contains("import script from"));
    assert!(entry.contains("export default component;"));

    let render = fs::read_to_string(out.join("App.render.js")).expect("render");
    assert!(render.contains(r#"_vm._t("header",null,null,{title:_vm.title})"#));
    assert!(render.contains("//# sourceMappingURL=App.render.js.map"));

    let map = fs::read_to_string(out.join("App.render.js.map")).expect("map");
    let map: serde_json::Value = serde_json::from_str(&map).unwrap();
    assert_eq!(map["version"], 3);

    let style = fs::read_to_string(out.join("App.style.1.css")).expect("style");
    assert!(style.starts_with("\nfooter { margin-top: 12px; }"));
}

#[test]
fn cli_build_hoists_without_maps() {
    let out = out_dir("hoist");
    let options = vellum_cli::load_options(None, true, true).unwrap();
    let written = vellum_cli::build_cmd(&[fixture()], Some(out.as_path()), &options).expect("build");
    assert!(written.iter().all(|p| p.extension().is_some_and(|e| e != "map")));

    let render = fs::read_to_string(out.join("App.render.js")).expect("render");
    assert!(render.contains("_vm._m(0)"));
    assert!(!render.contains("sourceMappingURL"));
}

#[test]
fn cli_config_file_seeds_options() {
    let out = out_dir("config");
    fs::create_dir_all(&out).unwrap();
    let config = out.join("vellum.json");
    fs::write(&config, r#"{"compile":{"hoistStatic":true},"includeSourcesContent":false}"#).unwrap();
    let options = vellum_cli::load_options(Some(&config), false, false).unwrap();
    assert!(options.compile.hoist_static);
    assert!(!options.include_sources_content);
    assert_eq!(options.extension, "vue");
}

#[test]
fn cli_ids_and_split() {
    let options = vellum_cli::load_options(None, false, false).unwrap();
    let ids = vellum_cli::ids_cmd(&fixture(), &options).unwrap();
    assert_eq!(ids.len(), 4);
    assert!(ids[2].ends_with("?vue&type=style&index=0&scoped=true"));
    assert!(ids[3].ends_with("?vue&type=style&index=1"));

    let json = vellum_cli::split_cmd(&fixture()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["blocks"].as_array().map(Vec::len), Some(4));
}

#[test]
fn cli_build_rejects_non_components() {
    let out = out_dir("reject");
    let options = vellum_cli::load_options(None, false, false).unwrap();
    let input = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    assert!(vellum_cli::build_cmd(&[input], Some(out.as_path()), &options).is_err());
}
