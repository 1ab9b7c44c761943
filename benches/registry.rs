use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hwmgr_core::{
    ComponentKind, HardwareManager, Identity, ManagerConfig, Payload, ScriptedDetection,
};
use std::sync::Arc;

const COMPONENTS: u32 = 512;

fn populated() -> HardwareManager {
    let manager = HardwareManager::new(Arc::new(ScriptedDetection::new()), ManagerConfig::default())
        .expect("default config is valid");
    manager.init().expect("fresh manager");
    for i in 0..COMPONENTS {
        let kind = if i % 2 == 0 { ComponentKind::Storage } else { ComponentKind::Network };
        manager
            .add(kind, Identity::new(format!("device{}", i)), Payload::None)
            .expect("add component");
    }
    manager
}

fn bench_add(c: &mut Criterion) {
    c.bench_function("registry_add", |b| {
        b.iter_batched(
            || {
                let manager =
                    HardwareManager::new(Arc::new(ScriptedDetection::new()), ManagerConfig::default())
                        .expect("default config is valid");
                manager.init().expect("fresh manager");
                manager
            },
            |manager| {
                for i in 0..64 {
                    let id = manager
                        .add(ComponentKind::Usb, Identity::new(format!("usb{}", i)), Payload::None)
                        .expect("add component");
                    black_box(id);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find(c: &mut Criterion) {
    let manager = populated();
    let ids: Vec<_> = manager
        .list(ComponentKind::Unknown, usize::MAX)
        .expect("list")
        .into_iter()
        .map(|component| component.id)
        .collect();
    c.bench_function("registry_find", |b| {
        b.iter(|| {
            for id in &ids {
                black_box(manager.find(*id).expect("present"));
            }
        })
    });
}

fn bench_list(c: &mut Criterion) {
    let manager = populated();
    c.bench_function("registry_list_all", |b| {
        b.iter(|| black_box(manager.list(ComponentKind::Unknown, usize::MAX).expect("list")))
    });
    c.bench_function("registry_list_kind", |b| {
        b.iter(|| black_box(manager.list(ComponentKind::Network, 16).expect("list")))
    });
}

criterion_group!(benches, bench_add, bench_find, bench_list);
criterion_main!(benches);
