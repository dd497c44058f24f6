use super::*;
use dockstage_build::{Instruction, PullBaseImage, RemoveIntermediate, StageSource};
use std::path::PathBuf;

const MINIMAL: &str = r#"
    dockerfile {
        from "alpine:3.20"
    }
"#;

#[test]
fn test_parse_minimal_manifest() {
    let manifest = parse_manifest_string(MINIMAL, Path::new("/tmp")).unwrap();

    assert_eq!(manifest.instructions, vec![Instruction::From("alpine:3.20".to_string())]);
    assert!(manifest.images.is_empty());
    assert!(manifest.registry.is_none());
    assert_eq!(manifest.options, BuildOptions::default());
    assert_eq!(manifest.stage_dir, None);
}

#[test]
fn test_parse_project_name() {
    let kdl = r#"
        project "myapp"
        dockerfile {
            from "alpine"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    assert_eq!(manifest.project, "myapp");
}

#[test]
fn test_parse_all_instructions() {
    let kdl = r#"
        dockerfile {
            from "alpine:3.20"
            run "apk add --no-cache curl"
            env "APP_ENV" "production"
            workdir "/app"
            expose 8080
            user "app"
            label "org.opencontainers.image.source" "https://example.com"
            entrypoint "/app/app"
            cmd "--serve" "--port" "8080"
            raw "HEALTHCHECK CMD curl -f http://localhost:8080/"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    assert_eq!(
        manifest.instructions,
        vec![
            Instruction::From("alpine:3.20".to_string()),
            Instruction::Run("apk add --no-cache curl".to_string()),
            Instruction::Env {
                key: "APP_ENV".to_string(),
                value: "production".to_string(),
            },
            Instruction::Workdir("/app".to_string()),
            Instruction::Expose(8080),
            Instruction::User("app".to_string()),
            Instruction::Label {
                key: "org.opencontainers.image.source".to_string(),
                value: "https://example.com".to_string(),
            },
            Instruction::Entrypoint(vec!["/app/app".to_string()]),
            Instruction::Cmd(vec![
                "--serve".to_string(),
                "--port".to_string(),
                "8080".to_string(),
            ]),
            Instruction::Raw("HEALTHCHECK CMD curl -f http://localhost:8080/".to_string()),
        ]
    );
}

#[test]
fn test_parse_copy_resolves_against_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("app"), b"binary").unwrap();

    let kdl = r#"
        dockerfile {
            from "alpine"
            copy "app" "/app/app"
            copy "assets" "/app/assets"
        }
    "#;

    let manifest = parse_manifest_string(kdl, dir.path()).unwrap();
    assert_eq!(
        manifest.instructions[1],
        Instruction::Copy {
            source: StageSource::File(dir.path().join("app")),
            target: "/app/app".to_string(),
        }
    );
    assert_eq!(
        manifest.instructions[2],
        Instruction::Copy {
            source: StageSource::Directory(dir.path().join("assets")),
            target: "/app/assets".to_string(),
        }
    );
}

#[test]
fn test_parse_inline_file() {
    let kdl = r#"
        dockerfile {
            from "alpine"
            file "/app/VERSION" "1.0.0\n"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    assert_eq!(
        manifest.instructions[1],
        Instruction::Copy {
            source: StageSource::Bytes(b"1.0.0\n".to_vec()),
            target: "/app/VERSION".to_string(),
        }
    );
}

#[test]
fn test_parse_unknown_instruction_error() {
    let kdl = r#"
        dockerfile {
            from "alpine"
            frobnicate "x"
        }
    "#;

    let result = parse_manifest_string(kdl, Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::InvalidConfig(msg)) if msg.contains("frobnicate")));
}

#[test]
fn test_parse_expose_out_of_range_error() {
    let kdl = r#"
        dockerfile {
            from "alpine"
            expose 70000
        }
    "#;

    let result = parse_manifest_string(kdl, Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::InvalidConfig(_))));
}

#[test]
fn test_parse_empty_cmd_error() {
    let kdl = r#"
        dockerfile {
            from "alpine"
            cmd
        }
    "#;

    let result = parse_manifest_string(kdl, Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::InvalidConfig(_))));
}

#[test]
fn test_parse_missing_dockerfile_error() {
    let kdl = r#"
        images {
            image "myapp:latest"
        }
    "#;

    let result = parse_manifest_string(kdl, Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::InvalidConfig(_))));
}

#[test]
fn test_parse_images() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        images {
            image "ghcr.io/org/myapp:latest"
            image "myapp:1.0.0"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    let images: Vec<String> = manifest.images.iter().map(|i| i.to_string()).collect();
    assert_eq!(images, vec!["ghcr.io/org/myapp:latest", "myapp:1.0.0"]);
}

#[test]
fn test_parse_top_level_image() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        image "myapp:dev"
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    assert_eq!(manifest.images.len(), 1);
    assert_eq!(manifest.images[0].tag(), Some("dev"));
}

#[test]
fn test_parse_invalid_image_name_error() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        image "MyApp:latest"
    "#;

    let result = parse_manifest_string(kdl, Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::Build(_))));
}

#[test]
fn test_parse_options() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        options {
            cache #false
            remove "always"
            pull "always"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    assert!(!manifest.options.cache);
    assert_eq!(manifest.options.remove, RemoveIntermediate::Always);
    assert_eq!(manifest.options.pull, PullBaseImage::Always);
}

#[test]
fn test_parse_options_partial_keeps_defaults() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        options {
            remove "never"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    assert!(manifest.options.cache);
    assert_eq!(manifest.options.remove, RemoveIntermediate::Never);
    assert_eq!(manifest.options.pull, PullBaseImage::IfMissing);
}

#[test]
fn test_parse_options_invalid_value_error() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        options {
            pull "sometimes"
        }
    "#;

    let result = parse_manifest_string(kdl, Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::InvalidConfig(_))));
}

#[test]
fn test_parse_stage_dir_relative_to_base() {
    let kdl = r#"
        stage_dir "target/docker"
        dockerfile {
            from "alpine"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/srv/app")).unwrap();
    assert_eq!(manifest.stage_dir, Some(PathBuf::from("/srv/app/target/docker")));
}

#[test]
fn test_parse_registry_with_password_env() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        registry {
            host "ghcr.io"
            username "org"
            password_env "DOCKSTAGE_TEST_REGISTRY_TOKEN"
        }
    "#;

    temp_env::with_var("DOCKSTAGE_TEST_REGISTRY_TOKEN", Some("s3cret"), || {
        let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
        let registry = manifest.registry.unwrap();
        assert_eq!(registry.host(), Some("ghcr.io"));
        assert_eq!(registry.username(), "org");
        assert_eq!(registry.password(), "s3cret");
    });
}

#[test]
fn test_parse_registry_missing_env_error() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        registry {
            username "org"
            password_env "DOCKSTAGE_TEST_UNSET_TOKEN"
        }
    "#;

    temp_env::with_var_unset("DOCKSTAGE_TEST_UNSET_TOKEN", || {
        let result = parse_manifest_string(kdl, Path::new("/tmp"));
        assert!(
            matches!(result, Err(ManifestError::MissingEnv(var)) if var == "DOCKSTAGE_TEST_UNSET_TOKEN")
        );
    });
}

#[test]
fn test_parse_registry_without_host() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        registry {
            username "octo"
            password "token"
        }
    "#;

    let manifest = parse_manifest_string(kdl, Path::new("/tmp")).unwrap();
    let registry = manifest.registry.unwrap();
    assert_eq!(registry.host(), None);
    assert_eq!(registry.password(), "token");
}

#[test]
fn test_parse_registry_without_username_error() {
    let kdl = r#"
        dockerfile {
            from "alpine"
        }
        registry {
            password "token"
        }
    "#;

    let result = parse_manifest_string(kdl, Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::InvalidConfig(_))));
}

#[test]
fn test_parse_invalid_kdl_error() {
    let result = parse_manifest_string("dockerfile {", Path::new("/tmp"));
    assert!(matches!(result, Err(ManifestError::KdlParse(_))));
}

#[test]
fn test_parse_manifest_file_defaults_project_to_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("webapp");
    std::fs::create_dir(&project_dir).unwrap();
    let path = project_dir.join("dockstage.kdl");
    std::fs::write(&path, MINIMAL).unwrap();

    let manifest = parse_manifest_file(&path).unwrap();
    assert_eq!(manifest.project, "webapp");
    assert_eq!(manifest.root, project_dir);
}

#[test]
fn test_parse_manifest_file_not_found() {
    let result = parse_manifest_file("/nonexistent/dockstage.kdl");
    assert!(matches!(result, Err(ManifestError::Io { .. })));
}

#[test]
fn test_require_images() {
    let manifest = parse_manifest_string(MINIMAL, Path::new("/tmp")).unwrap();
    assert!(matches!(manifest.require_images(), Err(ManifestError::NoImages)));
}
