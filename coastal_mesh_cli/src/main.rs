use clap::{Parser, Subcommand};
use coastal_mesh::io::{read_boundary_geojson, save_mesh, CheckpointSink, JsonCheckpointWriter};
use coastal_mesh::projection::Projection;
use coastal_mesh::quality::measure;
use coastal_mesh::{generate, DensityField, Domain, MeshConfig};

#[derive(Parser)]
#[command(name = "coastal_mesh_cli", about = "Geographic triangular mesh generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a mesh over a GeoJSON boundary polygon
    Mesh {
        /// Path to a GeoJSON file holding the boundary polygon
        #[arg(long)]
        boundary: String,
        /// Minimum edge length in meters
        #[arg(long)]
        h0: f64,
        /// Output mesh JSON path
        #[arg(long)]
        out: String,
        /// Iteration cap for the relaxation loop
        #[arg(long)]
        max_iter: Option<usize>,
        /// Iterations between progress reports
        #[arg(long)]
        nscreen: Option<usize>,
        /// Seed for the initial point distribution
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Directory for periodic checkpoints
        #[arg(long)]
        checkpoint_dir: Option<String>,
    },
    /// Print quality statistics for a saved mesh
    Stats {
        /// Path to a mesh JSON file
        mesh: String,
    },
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Mesh {
            boundary,
            h0,
            out,
            max_iter,
            nscreen,
            seed,
            checkpoint_dir,
        } => {
            let (outer, islands) = read_boundary_geojson(&boundary)?;
            let domain = Domain::single(outer, islands, h0);
            let density = DensityField::constant(h0);
            let config = MeshConfig {
                max_iterations: max_iter,
                report_interval: nscreen,
                seed,
                ..Default::default()
            };
            let sink = checkpoint_dir.map(JsonCheckpointWriter::new);
            let output = generate(
                &domain,
                &density,
                &config,
                None,
                sink.as_ref().map(|s| s as &dyn CheckpointSink),
            )?;
            save_mesh(&output.mesh, &out)?;
            let last = output.history.last();
            println!(
                "wrote {}: {} points, {} triangles ({:?}{})",
                out,
                output.mesh.n_points(),
                output.mesh.n_triangles(),
                output.termination,
                last.map(|r| format!(", mean quality {:.3}", r.mean))
                    .unwrap_or_default()
            );
        }
        Commands::Stats { mesh } => {
            let mesh = coastal_mesh::io::load_mesh(&mesh)?;
            let projection = Projection::for_extent(
                &coastal_mesh::geometry::BoundingBox::from_points(&mesh.points),
            );
            let planar = projection.forward_all(&mesh.points);
            let (_, row) = measure(&planar, &mesh.triangles);
            println!("points: {}", mesh.n_points());
            println!("triangles: {}", mesh.n_triangles());
            println!("quality mean: {:.4}", row.mean);
            println!("quality mean-3sigma: {:.4}", row.lower);
            println!("quality min: {:.4}", row.min);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
