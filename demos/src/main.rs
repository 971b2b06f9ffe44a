use std::fs::File;
use std::io::BufWriter;
use std::time::SystemTime;

use memory_stats::memory_stats;
use octet::{decode_value, encode_value, Decode, Encode};
use tracing_flame::FlameLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

fn setup_global_subscriber() -> impl Drop {
	let file = File::create("./trace.folded").unwrap();
	let flame_layer = FlameLayer::new(BufWriter::new(file)).with_file_and_line(false);
	let guard = flame_layer.flush_on_drop();

	let subscriber = Registry::default()
		.with(flame_layer);

	tracing::subscriber::set_global_default(subscriber).expect("Could not set global default");
	guard
}

#[derive(Encode, Decode)]
#[octet(id = 1)]
struct Vertex {
	x: f32,
	y: f32,
	z: f32,
}

#[derive(Encode, Decode)]
#[octet(id = 2)]
struct Mesh {
	name: String,
	vertices: Vec<Vertex>,
	indices: Vec<u32>,
}

fn sample_mesh(vertex_count: usize) -> Mesh {
	Mesh {
		name: "benchmark-mesh".to_owned(),
		vertices: (0..vertex_count)
			.map(|i| Vertex { x: i as f32, y: (i * 2) as f32, z: (i * 3) as f32 })
			.collect(),
		indices: (0..vertex_count as u32).collect(),
	}
}

fn main() {
	let _guard = setup_global_subscriber();

	let mut start = SystemTime::now();
	let mesh = sample_mesh(50_000);

	println! {
		"Sample construction time: {:?}, RAM: {}MB",
		start.elapsed().unwrap(),
		memory_stats().unwrap().virtual_mem as f32 / 1000000.0,
	}

	start = SystemTime::now();

	let bytes = encode_value(&mesh).unwrap();

	println! {
		"Encode time: {:?}, bytes: {}, RAM: {}MB",
		start.elapsed().unwrap(),
		bytes.len(),
		memory_stats().unwrap().virtual_mem as f32 / 1000000.0,
	}

	start = SystemTime::now();

	let decoded: Mesh = decode_value(&bytes).unwrap();

	println! {
		"Decode time: {:?}, RAM: {}MB",
		start.elapsed().unwrap(),
		memory_stats().unwrap().virtual_mem as f32 / 1000000.0,
	}

	println!("Round-tripped {} vertices, {} indices", decoded.vertices.len(), decoded.indices.len());
}
