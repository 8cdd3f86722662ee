use std::{fs, path::PathBuf};

use wsdlgen_codegen::{generate, Config};

const FIXTURES: &[&str] = &[
    "test.wsdl",
    "chromedata.xsd",
    "vboxweb.xsd",
    "list.xsd",
    "ferry.wsdl",
    "calculator.wsdl",
    "collisions.xsd",
];

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Builds every fixture's generated client against serde and quick-xml.
#[test]
fn generated_clients_compile() {
    let generated = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("generated");
    fs::create_dir_all(&generated).unwrap();

    let cases = trybuild::TestCases::new();

    for name in FIXTURES {
        let artifacts = generate(fixture(name), &Config::new("fixtures")).unwrap();
        let path = generated.join(format!("{}.rs", name.replace('.', "_")));

        fs::write(&path, format!("{}\nfn main() {{}}\n", artifacts.concatenate())).unwrap();
        cases.pass(&path);
    }
}
