use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use warden_authz::Authorizer;
use warden_core::{Permission, Role};
use warden_store::{AuthRepo, MemoryStore};

const ROLES: usize = 32;
const PERMISSIONS: usize = 256;

fn populated(rt: &tokio::runtime::Runtime) -> Arc<Authorizer<MemoryStore>> {
    rt.block_on(async {
        let store = MemoryStore::new();
        for p in 0..PERMISSIONS {
            store
                .create_permission(&Permission::new(format!("perm-{p}"), "", ""))
                .await
                .unwrap();
        }
        for r in 0..ROLES {
            let role_id = format!("role-{r}");
            store.create_role(&Role::new(role_id.as_str(), "")).await.unwrap();
            for p in (r..PERMISSIONS).step_by(ROLES) {
                store
                    .assign_permission_to_role(&role_id, &format!("perm-{p}"))
                    .await
                    .unwrap();
            }
        }
        Arc::new(Authorizer::new(store).await.unwrap())
    })
}

fn bench_granted(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let authz = populated(&rt);
    let held = Permission::new("perm-33", "", "");
    let missing = Permission::new("perm-34", "", "");

    let mut group = c.benchmark_group("granted");
    group.bench_function("hit", |b| {
        b.iter(|| rt.block_on(authz.granted(black_box("role-1"), black_box(&held))))
    });
    group.bench_function("miss", |b| {
        b.iter(|| rt.block_on(authz.granted(black_box("role-1"), black_box(&missing))))
    });
    group.bench_function("unknown_role", |b| {
        b.iter(|| rt.block_on(authz.granted(black_box("nobody"), black_box(&held))))
    });
    group.finish();
}

criterion_group!(benches, bench_granted);
criterion_main!(benches);
