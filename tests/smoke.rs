use stratavox_testkit::JsonlSink;
use stratavox_world::{ChunkPos, World, WorldConfig};

#[test]
fn generated_chunks_can_be_logged() {
    let world = World::new(WorldConfig {
        seed: 11,
        worker_threads: 1,
        ..WorldConfig::default()
    })
    .expect("default config is valid");
    let chunk = world
        .store()
        .chunk(ChunkPos::new(0, 0))
        .expect("generation succeeds");

    let mut sink = JsonlSink::create(std::env::temp_dir().join("stratavox-smoke.jsonl"))
        .expect("can create temp log");
    let top = chunk.top_solid_y(0, 0).unwrap_or_default().to_string();
    sink.record("ChunkGenerated", Some([0, 0]), &top)
        .expect("can write event");
}
