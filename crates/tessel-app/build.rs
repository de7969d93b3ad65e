// SPDX-License-Identifier: CEPL-1.0
// With `compile-shaders`, compiles shaders/mesh.{vert,frag} to SPIR-V in
// OUT_DIR for `include_bytes!`. Without it there is nothing to do.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    #[cfg(feature = "compile-shaders")]
    compile::run();
}

#[cfg(feature = "compile-shaders")]
mod compile {
    use std::{env, fs, path::PathBuf};

    const STAGES: [(&str, shaderc::ShaderKind); 2] = [
        ("mesh.vert", shaderc::ShaderKind::Vertex),
        ("mesh.frag", shaderc::ShaderKind::Fragment),
    ];

    pub fn run() {
        let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
        let src_dir = PathBuf::from(
            env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo"),
        )
        .join("shaders");

        let comp = shaderc::Compiler::new().expect("shaderc compiler");
        let mut opts = shaderc::CompileOptions::new().expect("shaderc options");
        opts.set_target_env(
            shaderc::TargetEnv::Vulkan,
            shaderc::EnvVersion::Vulkan1_0 as u32,
        );
        opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

        for (name, kind) in STAGES {
            let path = src_dir.join(name);
            println!("cargo:rerun-if-changed={}", path.display());
            let source = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()));
            let spv = comp
                .compile_into_spirv(&source, kind, name, "main", Some(&opts))
                .unwrap_or_else(|e| panic!("compiling {name}: {e}"));
            fs::write(out.join(format!("{name}.spv")), spv.as_binary_u8())
                .unwrap_or_else(|e| panic!("writing {name}.spv: {e}"));
        }
    }
}
