use std::{fs, hint::black_box, path::Path};

use criterion::{Criterion, criterion_group, criterion_main};
use fsroutes::{Config, DependencyList, Generator, SyncSelector};
use tempfile::TempDir;

const SECTIONS: usize = 20;
const PAGES_PER_SECTION: usize = 10;

fn write_route_tree(root: &Path) {
    for section in 0..SECTIONS {
        let dir = root.join(format!("section{section}"));
        fs::create_dir_all(dir.join("[id]")).expect("Failed to create section directory");
        for page in 0..PAGES_PER_SECTION {
            fs::write(
                dir.join(format!("page{page}.tsx")),
                format!(
                    r#"import {{ json }} from "@remix-run/node";

export const meta = () => [{{ title: "Page {page}" }}];

export async function loader({{ params }}) {{
  return json({{ section: {section}, page: {page}, id: params.id }});
}}

export default function Page() {{
  return <main className="page">{{`Section ${{{section}}}`}}</main>;
}}
"#
                ),
            )
            .expect("Failed to write route file");
        }
        fs::write(
            dir.join("[id]").join("index.ts"),
            "export const action = async () => null;\nexport default {};\n",
        )
        .expect("Failed to write route file");
    }
}

fn bench_generation(c: &mut Criterion) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    write_route_tree(temp.path());

    let base = temp.path().to_string_lossy().into_owned();
    let all = Generator::new(Config::new(&base));
    let named = Generator::new(
        Config::new(&base)
            .with_import_sync(SyncSelector::names(["loader", "meta"]))
            .with_import_async(["default", "action"]),
    );

    let mut group = c.benchmark_group("generation");
    group.bench_function("whole_module", |b| {
        b.iter(|| {
            black_box(
                all.generate(&mut DependencyList::default())
                    .expect("Generation failed"),
            )
        });
    });
    group.bench_function("named_bindings", |b| {
        b.iter(|| {
            black_box(
                named
                    .generate(&mut DependencyList::default())
                    .expect("Generation failed"),
            )
        });
    });
    group.finish();
}

criterion_group!(benches, bench_generation);
criterion_main!(benches);
