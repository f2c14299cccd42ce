use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use vellum_plugin::{ComponentResolver, FsLoader, PluginOptions, VirtualModuleId};
use vellum_sfc::BlockKind;

/// Options from an optional JSON file, then overridden by flags.
pub fn load_options(config: Option<&Path>, hoist_static: bool, no_source_map: bool) -> Result<PluginOptions> {
    let mut options = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => PluginOptions::default(),
    };
    if hoist_static {
        options.compile.hoist_static = true;
    }
    if no_source_map {
        options.compile.source_map = false;
    }
    Ok(options)
}

/// Block descriptors of a component file as pretty JSON.
pub fn split_cmd(input: &Path) -> Result<String> {
    let src =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let sfc = vellum_sfc::parse_sfc(&src).with_context(|| format!("failed to split {}", input.display()))?;
    Ok(serde_json::to_string_pretty(&sfc)?)
}

/// Virtual ids a component file exposes.
pub fn ids_cmd(input: &Path, options: &PluginOptions) -> Result<Vec<String>> {
    let resolver = ComponentResolver::new(options.clone(), FsLoader);
    let path = resolve_root(&resolver, input)?;
    let ids = resolver.block_ids(&path).unwrap_or_default();
    Ok(ids.iter().map(|id| id.encode(&options.id_tag)).collect())
}

/// Compile component files in parallel, returning every file written.
pub fn build_cmd(inputs: &[PathBuf], out_dir: Option<&Path>, options: &PluginOptions) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("target/vellum-gen"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let resolver = ComponentResolver::new(options.clone(), FsLoader);
    let written: Vec<Vec<PathBuf>> = inputs
        .par_iter()
        .map(|input| build_one(&resolver, input, &out_dir))
        .collect::<Result<_>>()?;
    Ok(written.into_iter().flatten().collect())
}

fn resolve_root(resolver: &ComponentResolver, input: &Path) -> Result<PathBuf> {
    let specifier = input.to_string_lossy();
    match resolver.resolve_id(&specifier, None)? {
        Some(vellum_plugin::Resolved::Root(path)) => Ok(path),
        _ => bail!(
            "{} is not a .{} component",
            input.display(),
            resolver.options().extension
        ),
    }
}

fn build_one(resolver: &ComponentResolver, input: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let path = resolve_root(resolver, input)?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("component");
    let tag = &resolver.options().id_tag;
    let mut written = Vec::new();

    let entry = resolver
        .load(&path.to_string_lossy())?
        .context("entry module was not produced")?;
    written.push(write(out_dir.join(format!("{stem}.entry.js")), &entry.code)?);

    let ids: Vec<VirtualModuleId> = resolver.block_ids(&path).unwrap_or_default();
    for id in &ids {
        let text = id.encode(tag);
        let file_name = match &id.kind {
            BlockKind::Template => format!("{stem}.render.js"),
            BlockKind::Style => format!("{stem}.style.{}.css", id.index),
            BlockKind::Script | BlockKind::Custom(_) => continue,
        };
        let loaded = resolver
            .load(&text)?
            .with_context(|| format!("{text} did not load"))?;
        let Some(mut out) = resolver.transform(&loaded.code, &text)? else {
            continue;
        };
        if let Some(map) = &out.map {
            let map_name = format!("{file_name}.map");
            let json = map
                .to_json()
                .with_context(|| format!("failed to serialize source map for {text}"))?;
            written.push(write(out_dir.join(&map_name), &json)?);
            let comment = if id.kind == BlockKind::Style {
                format!("\n/*# sourceMappingURL={map_name} */\n")
            } else {
                format!("//# sourceMappingURL={map_name}\n")
            };
            out.code.push_str(&comment);
        }
        written.push(write(out_dir.join(&file_name), &out.code)?);
    }
    log::info!("built {} ({} blocks)", input.display(), ids.len());
    Ok(written)
}

fn write(path: PathBuf, contents: &str) -> Result<PathBuf> {
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Generated: {}", path.display());
    Ok(path)
}
