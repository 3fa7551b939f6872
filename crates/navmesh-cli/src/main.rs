//! CLI utility for baking and inspecting navmesh containers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use navmesh_bake::{
    FixedOutputDir, NavMeshSurface, OutputLocator, Scene, SceneRelativeOutput, SurfaceSettings,
    TriangleNavMeshBuilder,
};
use navmesh_format::{TiledNavMesh, DT_VERTS_PER_POLYGON};

/// Bakes scene geometry into MSET navmesh containers and inspects them
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bake a scene description into NavigationMesh.bin
    Bake {
        /// Scene description (JSON)
        #[clap(long, value_parser)]
        scene: PathBuf,

        /// Output directory; defaults to the scene file's directory
        #[clap(long, value_parser)]
        out: Option<PathBuf>,

        /// Surface settings (JSON with `collect` and `build` sections)
        #[clap(long, value_parser)]
        settings: Option<PathBuf>,

        /// Also write the height mesh (NavigationMesh.obj)
        #[clap(long)]
        height_mesh: bool,

        /// Added to the Y of every input vertex
        #[clap(long)]
        vertical_offset: Option<f32>,
    },

    /// Print the contents of a navmesh container
    Inspect {
        /// Navmesh container file
        #[clap(value_parser)]
        file: PathBuf,

        /// Polygon vertex capacity to load with
        #[clap(long, default_value_t = DT_VERTS_PER_POLYGON)]
        verts_per_poly: usize,

        /// Print JSON instead of text
        #[clap(long)]
        json: bool,
    },

    /// Delete the baked files in a directory
    Clear {
        /// Directory holding NavigationMesh.bin / NavigationMesh.obj
        #[clap(long, value_parser)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Bake {
            scene,
            out,
            settings,
            height_mesh,
            vertical_offset,
        } => bake(&scene, out, settings.as_deref(), height_mesh, vertical_offset),
        Commands::Inspect {
            file,
            verts_per_poly,
            json,
        } => inspect(&file, verts_per_poly, json),
        Commands::Clear { out } => {
            let mut surface = make_surface(SurfaceSettings::default(), FixedOutputDir::new(&out));
            surface
                .clear(&Scene::default())
                .with_context(|| format!("Failed to clear {}", out.display()))?;
            println!("Cleared {}", out.display());
            Ok(())
        }
    }
}

fn make_surface(settings: SurfaceSettings, locator: impl OutputLocator + 'static) -> NavMeshSurface {
    NavMeshSurface::new(settings, locator, TriangleNavMeshBuilder)
}

fn bake(
    scene_path: &Path,
    out: Option<PathBuf>,
    settings_path: Option<&Path>,
    height_mesh: bool,
    vertical_offset: Option<f32>,
) -> Result<()> {
    let scene = Scene::load(scene_path)
        .with_context(|| format!("Failed to load scene {}", scene_path.display()))?;

    let mut settings = match settings_path {
        Some(path) => SurfaceSettings::from_json_file(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        None => SurfaceSettings::default(),
    };
    if height_mesh {
        settings.build.build_height_mesh = true;
    }
    if let Some(offset) = vertical_offset {
        settings.build.vertical_offset = offset;
    }
    log::debug!("Surface settings: {:?}", settings);

    let mut surface = match out {
        Some(dir) => make_surface(settings, FixedOutputDir(dir)),
        None => make_surface(settings, SceneRelativeOutput),
    };
    let summary = surface
        .bake(&scene)
        .with_context(|| format!("Failed to bake scene '{}'", scene.name))?;

    println!(
        "Baked {} targets into {} tiles ({} polygons)",
        summary.target_count, summary.tile_count, summary.poly_count
    );
    println!(
        "  {} ({} bytes)",
        summary.nav_mesh_path.display(),
        summary.nav_mesh_bytes
    );
    if let Some(path) = &summary.height_mesh_path {
        println!("  {}", path.display());
    }
    Ok(())
}

fn inspect(file: &Path, verts_per_poly: usize, json: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let nav_mesh = navmesh_format::deserialize(&bytes, Some(verts_per_poly))
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    if json {
        let report = json_report(&nav_mesh, bytes.len());
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let params = nav_mesh.params();
    println!("{}: {} bytes", file.display(), bytes.len());
    println!(
        "origin {:?}, tile size {} x {}, max tiles {}, max polys {}",
        params.origin, params.tile_width, params.tile_height, params.max_tiles, params.max_polys
    );
    for tile in nav_mesh.tiles() {
        let h = &tile.header;
        println!(
            "tile ({}, {}, layer {}): {} polys, {} verts, {} links / {}, {} detail tris, {} bv nodes, {} off-mesh",
            h.x,
            h.y,
            h.layer,
            h.poly_count,
            h.vert_count,
            tile.links.len(),
            h.max_link_count,
            h.detail_tri_count,
            h.bv_node_count,
            h.off_mesh_con_count
        );
    }
    println!("{} tiles", nav_mesh.tile_count());
    Ok(())
}

fn json_report(nav_mesh: &TiledNavMesh, size: usize) -> serde_json::Value {
    let params = nav_mesh.params();
    let tiles: Vec<serde_json::Value> = nav_mesh
        .tiles()
        .map(|tile| {
            let h = &tile.header;
            serde_json::json!({
                "x": h.x,
                "y": h.y,
                "layer": h.layer,
                "polys": h.poly_count,
                "verts": h.vert_count,
                "links": tile.links.len(),
                "max_links": h.max_link_count,
                "detail_meshes": h.detail_mesh_count,
                "detail_verts": h.detail_vert_count,
                "detail_tris": h.detail_tri_count,
                "bv_nodes": h.bv_node_count,
                "off_mesh_connections": h.off_mesh_con_count,
                "bmin": h.bmin,
                "bmax": h.bmax,
            })
        })
        .collect();

    serde_json::json!({
        "bytes": size,
        "params": {
            "origin": params.origin,
            "tile_width": params.tile_width,
            "tile_height": params.tile_height,
            "max_tiles": params.max_tiles,
            "max_polys": params.max_polys,
        },
        "tiles": tiles,
    })
}
