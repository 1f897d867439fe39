//! Analysis benchmarks: loading and type-checking a workspace, and walking it
//! for selectors through an embedded field.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;

use unbed::field_spec::parse_field_spec;
use unbed::loader::{load, SourceMap};
use unbed::manifest::Manifest;
use unbed::resolve::resolve_target;
use unbed::unbed::find_matches;

const GEOM: &str = r#"package geom

type Base struct {
	N, M int
	Name string
}

func (b *Base) Inc() { b.N++ }

type Outer struct {
	Base
	X int
}
"#;

/// A module with the declaring package and `importers` packages using it.
fn workspace(root: &Path, importers: usize) {
    std::fs::write(root.join("go.mod"), "module bench\n").unwrap();
    std::fs::create_dir_all(root.join("geom")).unwrap();
    std::fs::write(root.join("geom/geom.go"), GEOM).unwrap();
    for i in 0..importers {
        let dir = root.join(format!("use{i}"));
        std::fs::create_dir_all(&dir).unwrap();
        let mut src = format!("package use{i}\n\nimport \"bench/geom\"\n\n");
        for j in 0..50 {
            src.push_str(&format!(
                "func f{j}(o *geom.Outer) int {{\n\to.Inc()\n\tif o.N > {j} {{\n\t\treturn o.M + o.X\n\t}}\n\treturn len(o.Name)\n}}\n\n"
            ));
        }
        std::fs::write(dir.join("use.go"), src).unwrap();
    }
}

fn bench_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path(), 20);

    c.bench_function("load_20_packages", |b| {
        b.iter(|| {
            let mut sources = SourceMap::new();
            load(black_box(dir.path()), "bench/geom", &Manifest::default(), &mut sources).unwrap()
        })
    });
}

fn bench_walk(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path(), 20);
    let program = load(dir.path(), "bench/geom", &Manifest::default(), &mut SourceMap::new()).unwrap();
    let spec = parse_field_spec("geom.Outer.Base").unwrap();
    let target = resolve_target(&program, &spec, None).unwrap();

    c.bench_function("walk_20_packages", |b| b.iter(|| find_matches(black_box(&program), &target)));
}

criterion_group!(benches, bench_load, bench_walk);
criterion_main!(benches);
