mod support;

use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

use support::{json_output, root_cmd, TestRoot};

const LINK_HEADER: &[&str] = &[
    "Pétalo",
    "Tema",
    "Detalle",
    "Tipo",
    "Fecha",
    "Año",
    "Nombre",
    "Descripción",
    "URL",
];

fn write_links(root: &TestRoot) -> std::io::Result<std::path::PathBuf> {
    root.write_table(
        "enlaces",
        LINK_HEADER,
        &[
            &["Agua", "Baños secos", "", "Manual", "12 de abril", "2023", "Baños secos", "Manual de uso", "https://example.org/banos"],
            &["Energía", "Electricidad", "", "Video", "", "2021", "Luz solar", "Funcionamiento de la electricidad", "https://example.org/luz"],
            &["Agua", "Riego", "", "Guía", "marzo 2024", "", "Goteo", "Riego por goteo", "https://example.org/goteo"],
        ],
    )
}

#[test]
fn link_search_tolerates_typos() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;
    write_links(&root)?;

    let value = json_output(root_cmd(&root).args(["links", "search", "electrisidad"]))?;
    let links = value["data"]["links"].as_array().cloned().unwrap_or_default();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["name"], "Luz solar");
    assert_eq!(value["data"]["total"], 3);
    assert_eq!(value["data"]["petals"], serde_json::json!(["Agua", "Energía"]));

    root_cmd(&root)
        .args(["links", "search", "GOTEO"])
        .assert()
        .success()
        .stdout(contains("matched: 1 of 3"))
        .stdout(contains("Goteo <https://example.org/goteo> [Agua / Riego] 2024-03-01"));

    Ok(())
}

#[test]
fn blank_query_lists_everything_and_filters_by_petal() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;
    write_links(&root)?;

    let value = json_output(root_cmd(&root).args(["links", "search", "  ", "--petal", "agua", "--newest"]))?;
    let names: Vec<&str> = value["data"]["links"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|link| link["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Goteo", "Baños secos"]);
    assert_eq!(value["data"]["links"][1]["created_date"], "2023-04-12");

    Ok(())
}

#[test]
fn link_search_threshold_is_validated() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;
    write_links(&root)?;

    root_cmd(&root)
        .args(["links", "search", "agua", "--threshold", "1.5"])
        .assert()
        .code(2)
        .stderr(contains("threshold"));

    // A strict threshold leaves only exact substrings.
    let value = json_output(root_cmd(&root).args(["links", "search", "electrisidad", "--threshold", "1"]))?;
    assert_eq!(value["data"]["links"].as_array().map(Vec::len), Some(0));

    Ok(())
}

#[test]
fn internal_agreements_by_topic_and_all() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;
    root.write_table(
        "acuerdos_internos",
        &["Tema", "Orden", "Acuerdo"],
        &[
            &["Ruido", "2", "Música baja después de las 22"],
            &["Visitas", "1", "Avisar con un día de anticipación"],
            &["Ruido", "1", "Silencio en la biblioteca"],
            &["Ruido", "", "Sin número"],
        ],
    )?;

    root_cmd(&root)
        .args(["agreements", "internal"])
        .assert()
        .success()
        .stdout(contains("topics: 2"))
        .stdout(contains("--topic <topic>"));

    let value = json_output(root_cmd(&root).args(["agreements", "internal", "--topic", "ruido"]))?;
    let texts: Vec<&str> = value["data"]["groups"][0]["agreements"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|agreement| agreement["text"].as_str())
        .collect();
    assert_eq!(
        texts,
        vec!["Silencio en la biblioteca", "Música baja después de las 22", "Sin número"]
    );

    let value = json_output(root_cmd(&root).args(["agreements", "internal", "--all"]))?;
    assert_eq!(value["data"]["groups"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["data"]["groups"][1]["topic"], "Visitas");

    root_cmd(&root)
        .args(["agreements", "internal", "--all", "--topic", "Ruido"])
        .assert()
        .failure();

    Ok(())
}

#[test]
fn external_agreements_by_kind_with_search() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::new()?;
    root.write_table(
        "actuerdos_externos",
        &["Acuerdo", "Aspecto", "Detalle"],
        &[
            &["Talleres", "Cupos", "Máximo 20 personas"],
            &["Visitas", "Horario", "De 10 a 17"],
            &["Talleres", "Materiales", "Cada taller trae lo suyo"],
        ],
    )?;

    let value = json_output(root_cmd(&root).args(["agreements", "external"]))?;
    assert_eq!(value["data"]["kinds"], serde_json::json!(["Talleres", "Visitas"]));
    assert!(value["data"].get("entries").is_none());

    root_cmd(&root)
        .args(["agreements", "external", "--kind", "talleres"])
        .assert()
        .success()
        .stdout(contains("Cupos: Máximo 20 personas"))
        .stdout(contains("Materiales: Cada taller trae lo suyo"));

    root_cmd(&root)
        .args(["agreements", "external", "--kind", "Talleres", "--search", "materials"])
        .assert()
        .success()
        .stdout(contains("Materiales").and(contains("Cupos").not()));

    Ok(())
}
