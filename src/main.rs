use std::path::PathBuf;

use clap::Parser;
use glb_sparse::types::ComponentType;
use glb_sparse::{GlbModel, ViewSource, patch_views, view_usage};

/// Report buffer view usage in a .glb and apply its sparse accessors.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// GLB file to inspect
    file: PathBuf,

    /// Print the patched float components of each sparse view
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let model = GlbModel::open(&args.file)?;
    println!(
        "{}: {} buffer views, {} accessors, {} meshes",
        args.file.display(),
        model.view_count(),
        model.accessor_count(),
        model.document().meshes().len()
    );

    for usage in view_usage(&model) {
        let buffer_len = model
            .view(usage.view)
            .and_then(|v| model.buffer(v.buffer).map(<[u8]>::len))
            .unwrap_or(0);
        println!(
            "view {:>3}: {:>8} bytes (buffer {} bytes), target {:?}, accessors {:?}{}{}",
            usage.view,
            usage.byte_length,
            buffer_len,
            usage.target,
            usage.accessors,
            match usage.sparse_accessor {
                Some(a) => format!(", sparse via accessor {a}"),
                None => String::new(),
            },
            if usage.draco { ", draco stream" } else { "" },
        );
    }

    for patched in patch_views(&model) {
        match &patched.result {
            Ok(bytes) => {
                println!(
                    "view {} patched by accessor {}: {} bytes",
                    patched.view,
                    patched.accessor,
                    bytes.len()
                );
                if args.dump {
                    dump(&model, patched.accessor, bytes)?;
                }
            }
            Err(e) => println!("view {} failed: {e}", patched.view),
        }
    }
    Ok(())
}

fn dump(model: &GlbModel, accessor: usize, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let accessor = model.accessor(accessor)?;
    if accessor.component_type != ComponentType::F32 {
        println!("  ({:?} components, not dumped)", accessor.component_type);
        return Ok(());
    }
    let width = accessor.element_type.component_count();
    for (i, element) in glb_sparse::decode::as_f32(bytes).chunks(width).enumerate() {
        println!("  [{i}] {element:?}");
    }
    Ok(())
}
