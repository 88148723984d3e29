//! Integration tests for the strata library API.
//!
//! These drive the pipeline in-process through `orchestrator` and the phase
//! modules and check the guarantees callers rely on: deterministic output,
//! layering precedence, the new-key guard, the schema gate, library routing
//! and inheritance, and inspection modes.

use serde_yaml::Value as YamlValue;
use strata::config::{FileMark, FlagOverlays, OutputMode, TemplateOptions};
use strata::documents::ValuesDocument;
use strata::error::Error;
use strata::evaluator::SubstitutionEvaluator;
use strata::filesystem::FileSet;
use strata::path::LibraryPath;
use strata::phases::{orchestrator, phase1, phase3, TemplateOutput};

fn yaml(text: &str) -> YamlValue {
    serde_yaml::from_str(text).unwrap()
}

fn file_set(entries: &[(&str, &str)]) -> FileSet {
    let mut files = FileSet::new();
    for (path, content) in entries {
        files.add_file_string(path, content).unwrap();
    }
    files
}

fn flags(options: &TemplateOptions) -> FlagOverlays {
    options
        .data_values
        .as_overlays_from(options.strict_yaml, &[], &|path: &str| -> strata::error::Result<String> {
            Err(Error::Filesystem {
                message: format!("unexpected read of {}", path),
            })
        })
        .unwrap()
}

fn run(entries: &[(&str, &str)], options: &TemplateOptions) -> strata::error::Result<TemplateOutput> {
    orchestrator::run_with_overlays(
        file_set(entries),
        options,
        &SubstitutionEvaluator::new(),
        &flags(options),
    )
}

fn documents(output: &TemplateOutput) -> Vec<YamlValue> {
    output.doc_set.values().cloned().collect()
}

fn inspect_values(entries: &[(&str, &str)], options: &TemplateOptions) -> strata::error::Result<YamlValue> {
    let options = TemplateOptions {
        mode: OutputMode::ValuesInspect,
        ..options.clone()
    };
    let output = run(entries, &options)?;
    Ok(documents(&output).remove(0))
}

const VALUES: &str = "#@data/values\n---\na: 1\nb: 2\n";

mod determinism {
    use super::*;

    #[test]
    fn test_same_input_same_output() {
        let entries = [
            ("values.yml", "#@data/values\n---\nname: web\nport: 80\n"),
            ("_lib/x/values.yml", "#@data/values\n---\nname: x\n"),
            ("_lib/x/x.yml", "x: (@= data.values.name @)\n"),
            ("app.yml", "app: (@= data.values.name @)\nport: (@= data.values.port @)\n"),
        ];
        let options = TemplateOptions::default();

        let first = run(&entries, &options).unwrap();
        let second = run(&entries, &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            documents(&first),
            vec![yaml("app: web\nport: 80"), yaml("x: x")]
        );
    }
}

mod precedence {
    use super::*;

    #[test]
    fn test_later_files_override_earlier_files() {
        let entries = [
            ("values-1.yml", "#@data/values\n---\nname: first\n"),
            ("values-2.yml", "#@data/values\n---\nname: second\n"),
        ];
        let values = inspect_values(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(values, yaml("name: second"));
    }

    #[test]
    fn test_later_documents_override_earlier_documents() {
        let entries = [(
            "values.yml",
            "#@data/values\n---\nname: first\n#@data/values\n---\nname: second\n",
        )];
        let values = inspect_values(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(values, yaml("name: second"));
    }

    #[test]
    fn test_flags_override_files_in_family_order() {
        let mut options = TemplateOptions::default();
        options.data_values.kv_strings = vec!["a=from-string".to_string()];
        options.data_values.kv_yamls = vec!["a=10".to_string(), "b=20".to_string()];

        let values = inspect_values(&[("values.yml", VALUES)], &options).unwrap();
        assert_eq!(values, yaml("a: 10\nb: 20"));
    }

    #[test]
    fn test_flags_override_nested_keys_only() {
        let mut options = TemplateOptions::default();
        options.data_values.kv_yamls = vec!["app.port=8080".to_string()];

        let entries = [("values.yml", "#@data/values\n---\napp:\n  name: web\n  port: 80\n")];
        let values = inspect_values(&entries, &options).unwrap();
        assert_eq!(values, yaml("app:\n  name: web\n  port: 8080"));
    }

    #[test]
    fn test_end_to_end_overlay_with_new_keys() {
        let entries = [
            ("values.yml", VALUES),
            (
                "overlay.yml",
                "#@overlay/match missing_ok=True\n#@data/values\n---\nb: 3\nc: 4\n",
            ),
        ];
        let values = inspect_values(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(values, yaml("a: 1\nb: 3\nc: 4"));
    }
}

mod new_key_guard {
    use super::*;

    #[test]
    fn test_new_key_in_document_is_rejected() {
        let entries = [
            ("values.yml", VALUES),
            ("overlay.yml", "#@data/values\n---\nc: 4\n"),
        ];
        let err = inspect_values(&entries, &TemplateOptions::default()).unwrap_err();
        match err {
            Error::MergeConflict {
                key_path,
                source_name,
                ..
            } => {
                assert_eq!(key_path, "c");
                assert!(source_name.contains("overlay.yml"));
            }
            other => panic!("expected merge conflict, got {other}"),
        }
    }

    #[test]
    fn test_new_key_in_flag_is_rejected() {
        let mut options = TemplateOptions::default();
        options.data_values.kv_strings = vec!["c=4".to_string()];

        let err = inspect_values(&[("values.yml", VALUES)], &options).unwrap_err();
        assert!(matches!(err, Error::MergeConflict { .. }));
    }

    #[test]
    fn test_new_key_allowed_by_flag_suffix() {
        let mut options = TemplateOptions::default();
        options.data_values.kv_yamls = vec!["c+=4".to_string()];

        let values = inspect_values(&[("values.yml", VALUES)], &options).unwrap();
        assert_eq!(values, yaml("a: 1\nb: 2\nc: 4"));
    }

    #[test]
    fn test_new_key_allowed_by_implicit_overrides() {
        let options = TemplateOptions {
            implicit_map_key_overrides: true,
            ..Default::default()
        };
        let entries = [
            ("values.yml", VALUES),
            ("overlay.yml", "#@data/values\n---\nc: 4\n"),
        ];
        let values = inspect_values(&entries, &options).unwrap();
        assert_eq!(values, yaml("a: 1\nb: 2\nc: 4"));
    }

    #[test]
    fn test_failed_run_produces_no_output() {
        let entries = [
            ("values.yml", VALUES),
            ("overlay.yml", "#@data/values\n---\nc: 4\n"),
            ("app.yml", "a: (@= data.values.a @)\n"),
        ];
        assert!(run(&entries, &TemplateOptions::default()).is_err());
    }
}

mod schema_gate {
    use super::*;

    const SCHEMA: &str = "#@data/values-schema\n---\na: 0\nb: 0\n";

    fn options(schema_enabled: bool) -> TemplateOptions {
        TemplateOptions {
            schema_enabled,
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_and_disabled_uses_no_schema() {
        let root = phase1::build(file_set(&[("values.yml", VALUES)]), &options(false)).unwrap();
        let schema = phase3::resolve(&root, false).unwrap();
        assert_eq!(schema.defaults(), YamlValue::Null);
    }

    #[test]
    fn test_absent_and_enabled_is_a_policy_error() {
        let err = run(&[("values.yml", VALUES)], &options(true)).unwrap_err();
        assert!(matches!(err, Error::SchemaPolicy { .. }));
    }

    #[test]
    fn test_present_and_disabled_ignores_schema() {
        let entries = [("schema.yml", SCHEMA), ("values.yml", "#@data/values\n---\nz: 1\n")];
        let values = inspect_values(&entries, &options(false)).unwrap();
        assert_eq!(values, yaml("z: 1"));
    }

    #[test]
    fn test_present_and_enabled_supplies_defaults() {
        let entries = [("schema.yml", SCHEMA), ("values.yml", "#@data/values\n---\nb: 5\n")];
        let values = inspect_values(&entries, &options(true)).unwrap();
        assert_eq!(values, yaml("a: 0\nb: 5"));
    }

    #[test]
    fn test_present_and_enabled_guards_keys() {
        let entries = [("schema.yml", SCHEMA), ("values.yml", "#@data/values\n---\nz: 1\n")];
        let err = inspect_values(&entries, &options(true)).unwrap_err();
        assert!(matches!(err, Error::MergeConflict { .. }));
    }
}

mod library_tree {
    use super::*;

    #[test]
    fn test_implicit_and_explicit_declarations_share_a_library() {
        let mut files = file_set(&[
            ("_lib/a/_lib/b/one.yml", "one: 1\n"),
            ("extra/two.yml", "two: 2\n"),
        ]);
        strata::config::apply_file_marks(
            &mut files,
            &[FileMark::parse("extra/two.yml:library=a/b").unwrap()],
        )
        .unwrap();

        let root = phase1::build(files, &TemplateOptions::default()).unwrap();
        let paths: Vec<String> = root.library_paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["(root)", "a", "a/b"]);

        let b = root.find(&LibraryPath::parse("a/b").unwrap()).unwrap();
        assert_eq!(b.files.len(), 2);
    }

    #[test]
    fn test_two_explicit_declarations_of_one_path_share_a_library() {
        let mut files = file_set(&[
            ("_lib/a/base.yml", "base: 1\n"),
            ("x/one.yml", "one: 1\n"),
            ("y/two.yml", "two: 2\n"),
        ]);
        strata::config::apply_file_marks(
            &mut files,
            &[
                FileMark::parse("x/one.yml:library=a/b").unwrap(),
                FileMark::parse("y/two.yml:library=a/b").unwrap(),
            ],
        )
        .unwrap();

        let root = phase1::build(files, &TemplateOptions::default()).unwrap();
        let paths: Vec<String> = root.library_paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["(root)", "a", "a/b"]);

        let a = root.find(&LibraryPath::parse("a").unwrap()).unwrap();
        assert_eq!(a.children.len(), 1);
        let b = root.find(&LibraryPath::parse("a/b").unwrap()).unwrap();
        let names: Vec<&str> = b.files.iter().map(|f| f.path()).collect();
        assert_eq!(names, vec!["x/one.yml", "y/two.yml"]);
    }

    #[test]
    fn test_two_schemas_in_one_library_fail() {
        let entries = [
            ("schema-1.yml", "#@data/values-schema\n---\na: 0\n"),
            ("schema-2.yml", "#@data/values-schema\n---\nb: 0\n"),
        ];
        let err = phase1::build(file_set(&entries), &TemplateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MultipleSchemas { count: 2, .. }));
    }

    #[test]
    fn test_duplicate_paths_fail() {
        let mut files = FileSet::new();
        files.add_file_string("a.yml", "a: 1\n").unwrap();
        assert!(files.add_file_string("./a.yml", "a: 2\n").is_err());
    }
}

mod routing {
    use super::*;

    const DB: [(&str, &str); 2] = [
        ("_lib/db/values.yml", "#@data/values\n---\nname: pg\n"),
        ("_lib/db/db.yml", "db: (@= data.values.name @)\n"),
    ];

    #[test]
    fn test_root_document_routes_to_child() {
        let mut entries = DB.to_vec();
        entries.push((
            "db-values.yml",
            "#@library/ref \"@db\"\n#@data/values\n---\nname: mysql\n",
        ));
        let output = run(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(documents(&output), vec![yaml("db: mysql")]);
    }

    #[test]
    fn test_child_document_routes_to_root() {
        let mut entries = DB.to_vec();
        entries.push(("values.yml", "#@data/values\n---\nowner: nobody\n"));
        entries.push((
            "_lib/db/up.yml",
            "#@library/ref \"/\"\n#@data/values\n---\nowner: db-team\n",
        ));
        let values = inspect_values(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(values, yaml("owner: db-team"));
    }

    #[test]
    fn test_flag_routes_to_child() {
        let mut options = TemplateOptions::default();
        options.data_values.kv_strings = vec!["@db:name=oracle".to_string()];
        let output = run(&DB, &options).unwrap();
        assert_eq!(documents(&output), vec![yaml("db: oracle")]);
    }

    #[test]
    fn test_routed_values_follow_own_values() {
        let mut options = TemplateOptions::default();
        options.data_values.kv_strings = vec!["@db:name=from-flag".to_string()];
        let mut entries = DB.to_vec();
        entries.push((
            "db-values.yml",
            "#@library/ref \"@db\"\n#@data/values\n---\nname: from-root\n",
        ));
        let output = run(&entries, &options).unwrap();
        assert_eq!(documents(&output), vec![yaml("db: from-flag")]);
    }

    #[test]
    fn test_unknown_target_is_unresolved() {
        let entries = [(
            "values.yml",
            "#@library/ref \"@nowhere\"\n#@data/values\n---\na: 1\n",
        )];
        let err = run(&entries, &TemplateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedLibrary { .. }));
    }

    #[test]
    fn test_library_flag_overlay_has_root_origin() {
        let mut options = TemplateOptions::default();
        options.data_values.kv_strings = vec!["@db:name=x".to_string()];
        let overlays = flags(&options);
        assert!(overlays.root.is_empty());
        assert_eq!(overlays.libraries[0].target, LibraryPath::parse("db").unwrap());
        assert!(overlays.libraries[0].origin.is_root());
    }
}

mod inheritance {
    use super::*;

    #[test]
    fn test_child_sees_parent_values_beneath_its_own() {
        let entries = [
            ("values.yml", "#@data/values\n---\nregion: eu\nname: root\n"),
            ("_lib/db/values.yml", "#@data/values\n---\nname: db\n"),
            (
                "_lib/db/db.yml",
                "name: (@= data.values.name @)\nregion: (@= data.values.region @)\n",
            ),
        ];
        let output = run(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(documents(&output), vec![yaml("name: db\nregion: eu")]);
    }

    #[test]
    fn test_parent_values_are_base_layer_for_child_files() {
        let entries = [
            ("values.yml", "#@data/values\n---\na: 1\nb: 2\n"),
            ("_lib/app/v1.yml", "#@data/values\n---\na: 5\n"),
            ("_lib/app/v2.yml", "#@data/values\n---\nb: 9\n"),
            ("_lib/app/t.yml", "a: (@= data.values.a @)\nb: (@= data.values.b @)\n"),
        ];
        let output = run(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(documents(&output), vec![yaml("{a: 5, b: 9}")]);
    }

    #[test]
    fn test_grandchild_inherits_through_child() {
        let entries = [
            ("values.yml", "#@data/values\n---\nregion: eu\n"),
            ("_lib/a/_lib/b/b.yml", "region: (@= data.values.region @)\n"),
        ];
        let output = run(&entries, &TemplateOptions::default()).unwrap();
        assert_eq!(documents(&output), vec![yaml("region: eu")]);
    }
}

mod inspection {
    use super::*;

    const BROKEN: (&str, &str) = ("broken.yml", "value: (@= data.values.missing @)\n");

    #[test]
    fn test_files_inspect_skips_values_and_templates() {
        let options = TemplateOptions {
            mode: OutputMode::FilesInspect,
            ..Default::default()
        };
        let entries = [
            ("values.yml", VALUES),
            ("overlay.yml", "#@data/values\n---\nnew: key\n"),
            BROKEN,
        ];
        let output = run(&entries, &options).unwrap();
        assert_eq!(
            documents(&output),
            vec![yaml("[broken.yml, overlay.yml, values.yml]")]
        );
        assert!(output.files.is_empty());
    }

    #[test]
    fn test_files_inspect_lists_unparseable_template() {
        let entries = [
            ("values.yml", VALUES),
            ("broken-body.yml", "# plain comment\nkey: [unclosed\n"),
            ("_lib/app/broken-values.yml", "#@data/values\n---\na: [unclosed\n"),
        ];
        let options = TemplateOptions {
            mode: OutputMode::FilesInspect,
            ..Default::default()
        };
        let output = run(&entries, &options).unwrap();
        assert_eq!(
            documents(&output),
            vec![yaml("[_lib/app/broken-values.yml, broken-body.yml, values.yml]")]
        );

        assert!(run(&entries, &TemplateOptions::default()).is_err());
    }

    #[test]
    fn test_values_inspect_skips_templates() {
        let values = inspect_values(&[("values.yml", VALUES), BROKEN], &TemplateOptions::default())
            .unwrap();
        assert_eq!(values, yaml("a: 1\nb: 2"));
    }

    #[test]
    fn test_normal_mode_evaluates_templates() {
        let err = run(&[("values.yml", VALUES), BROKEN], &TemplateOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Evaluation { .. }));
    }
}

#[test]
fn test_flag_overlay_documents_are_sourced() {
    let overlays = FlagOverlays {
        root: vec![ValuesDocument::new(yaml("a: 5"), "caller")],
        libraries: Vec::new(),
    };
    let output = orchestrator::run_with_overlays(
        file_set(&[("values.yml", VALUES), ("app.yml", "a: (@= data.values.a @)\n")]),
        &TemplateOptions::default(),
        &SubstitutionEvaluator::new(),
        &overlays,
    )
    .unwrap();
    assert_eq!(documents(&output), vec![yaml("a: 5")]);
}
