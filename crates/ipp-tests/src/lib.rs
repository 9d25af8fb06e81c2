//! Integration tests for the ipp crates.
//!
//! End-to-end scenarios that build whole pipelines out of the operators in
//! `ipp-ops` and drive images through them.

#[cfg(test)]
mod tests {
    use ipp_core::{FormatTag, ImageData};
    use ipp_ops::{
        Addition, Blend, Bypass, Fork, Hadamard, Manifest, Merge, Product, Registry, Split,
    };
    use ipp_pipeline::{ExecutionMode, Operator, Pipeline, PipelineError};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_image(rng: &mut StdRng, width: u32, height: u32, channels: u32) -> ImageData {
        let data = (0..width * height * channels).map(|_| rng.r#gen::<u8>()).collect();
        ImageData::from_u8(width, height, channels, data).unwrap()
    }

    fn split_merge_pipeline() -> Pipeline {
        let mut p = Pipeline::new();
        p.create_bus("in", FormatTag::Bgr).unwrap();
        for bus in ["b", "g", "r"] {
            p.create_bus(bus, FormatTag::Channel).unwrap();
        }
        p.create_bus("out", FormatTag::Triple).unwrap();
        p.insert_operator("split", Split::new(), ["in"], ["b", "g", "r"])
            .unwrap();
        p.insert_operator("merge", Merge::new(), ["b", "g", "r"], ["out"])
            .unwrap();
        p.assign_layer("split", 0).unwrap();
        p.assign_layer("merge", 1).unwrap();
        p.set_execution_order([0, 1]).unwrap();
        p
    }

    /// `in -> fork(n) -> blend(equal weights) -> out`
    fn fork_blend_pipeline(n: usize, format: FormatTag) -> Pipeline {
        let branches: Vec<String> = (0..n).map(|i| format!("branch{i}")).collect();
        let mut p = Pipeline::new();
        p.create_bus("in", format).unwrap();
        p.create_bus("out", format).unwrap();
        for bus in &branches {
            p.create_bus(bus.as_str(), format).unwrap();
        }

        let mut fork = Fork::new(format);
        fork.set_outputs(n).unwrap();
        let mut blend = Blend::new(format);
        blend.set_inputs(n).unwrap();
        blend.set_weights(vec![1.0 / n as f64; n]);

        p.insert_operator("fork", fork, ["in"], branches.clone())
            .unwrap();
        p.insert_operator("blend", blend, branches, ["out"]).unwrap();
        p.assign_layer("fork", "fan-out").unwrap();
        p.assign_layer("blend", "fan-in").unwrap();
        p.set_execution_order(["fan-out", "fan-in"]).unwrap();
        p
    }

    proptest! {
        #[test]
        fn test_split_merge_is_identity(
            width in 1u32..9,
            height in 1u32..9,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let image = random_image(&mut rng, width, height, 3);
            let mut p = split_merge_pipeline();
            p.write("in", image.clone()).unwrap();
            p.run().unwrap();
            prop_assert_eq!(p.read("out").unwrap(), &image);
        }

        #[test]
        fn test_fork_blend_preserves_image(
            n in 1usize..7,
            width in 1u32..9,
            height in 1u32..9,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let image = random_image(&mut rng, width, height, 1);
            let mut p = fork_blend_pipeline(n, FormatTag::Channel);
            p.write("in", image.clone()).unwrap();
            p.run().unwrap();
            let out = p.read("out").unwrap().to_u8();
            for (a, b) in out.iter().zip(image.to_u8()) {
                prop_assert!(a.abs_diff(b) <= 1, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_weighted_fork_blend_two_layers() {
        let mut rng = StdRng::seed_from_u64(0x1bb);
        let image = random_image(&mut rng, 16, 12, 3);

        let mut p = fork_blend_pipeline(4, FormatTag::Triple);
        let weights = [0.1, 0.2, 0.3, 0.4];
        p.set_param("blend", "weights", weights.to_vec()).unwrap();
        p.write("in", image.clone()).unwrap();
        p.run().unwrap();

        let total: f64 = weights.iter().sum();
        let out = p.read("out").unwrap().to_u8();
        for (got, v) in out.iter().zip(image.to_u8()) {
            let expected: f64 = weights.iter().map(|w| w / total * v as f64).sum();
            assert!((*got as f64 - expected).abs() <= 1.0 + 1e-6, "{got} vs {expected}");
        }
    }

    #[test]
    fn test_fork_products_blend_three_layers() {
        let mut rng = StdRng::seed_from_u64(42);
        let image = random_image(&mut rng, 8, 8, 1);
        let gains = [0.5, 1.0, 1.5, 2.0];
        let weights = [4.0, 3.0, 2.0, 1.0];

        let mut p = Pipeline::new();
        p.create_bus("in", FormatTag::Channel).unwrap();
        p.create_bus("out", FormatTag::Channel).unwrap();
        let mut fork = Fork::channel();
        fork.set_outputs(4).unwrap();
        let mut blend = Blend::channel();
        blend.set_inputs(4).unwrap();
        blend.set_weights(weights.to_vec());

        let forked: Vec<String> = (0..4).map(|i| format!("f{i}")).collect();
        let scaled: Vec<String> = (0..4).map(|i| format!("s{i}")).collect();
        for bus in forked.iter().chain(&scaled) {
            p.create_bus(bus.as_str(), FormatTag::Channel).unwrap();
        }
        p.insert_operator("fork", fork, ["in"], forked.clone()).unwrap();
        p.assign_layer("fork", 0).unwrap();
        for (i, gain) in gains.iter().enumerate() {
            let mut product = Product::new(FormatTag::Channel);
            product.set_value(*gain);
            let name = format!("scale{i}");
            p.insert_operator(name.as_str(), product, [forked[i].as_str()], [scaled[i].as_str()])
                .unwrap();
            p.assign_layer(name.as_str(), 1).unwrap();
        }
        p.insert_operator("blend", blend, scaled, ["out"]).unwrap();
        p.assign_layer("blend", 2).unwrap();
        p.set_execution_order([0, 1, 2]).unwrap();

        p.write("in", image.clone()).unwrap();
        p.run().unwrap();

        let total: f64 = weights.iter().sum();
        let out = p.read("out").unwrap().to_u8();
        for (got, v) in out.iter().zip(image.to_u8()) {
            let expected: f64 = gains
                .iter()
                .zip(&weights)
                .map(|(g, w)| {
                    let branch = ((v as f64 - 127.0) * g + 127.0).clamp(0.0, 255.0).trunc();
                    branch * w / total
                })
                .sum();
            assert!((*got as f64 - expected).abs() <= 1.0 + 1e-6, "{got} vs {expected}");
        }
    }

    #[test]
    fn test_product_in_pipeline() {
        let input = ImageData::from_u8(3, 1, 1, vec![10, 77, 250]).unwrap();
        let mut product = Product::new(FormatTag::Channel);
        product.set_value(2.0);
        product.set_offset(100.0);

        // (10 - 100) * 2 + 100 = -80, (77 - 100) * 2 + 100 = 54, 250 -> 400
        let clipped = product.run(vec![input.clone()]).unwrap();
        assert_eq!(clipped[0].to_f32(), vec![0.0, 54.0, 255.0]);
        product.set_clipping(false);
        let unclipped = product.run(vec![input.clone()]).unwrap();
        assert_eq!(unclipped[0].to_f32(), vec![-80.0, 54.0, 400.0]);

        let mut p = Pipeline::new();
        p.create_bus("in", FormatTag::Channel).unwrap();
        p.create_bus("out", FormatTag::Channel).unwrap();
        p.insert_operator("product", product, ["in"], ["out"]).unwrap();
        p.assign_layer("product", 0).unwrap();
        p.set_execution_order([0]).unwrap();
        p.write("in", input).unwrap();
        p.run().unwrap();
        // The bus saturates the unclipped values when storing them.
        assert_eq!(p.read("out").unwrap().to_u8(), vec![0, 54, 255]);
    }

    #[test]
    fn test_split_add_merge() {
        let mut p = split_merge_pipeline();
        let mut p2 = Pipeline::new();
        p2.create_bus("in", FormatTag::Rgb).unwrap();
        for bus in ["r", "g", "g+", "b"] {
            p2.create_bus(bus, FormatTag::Channel).unwrap();
        }
        p2.create_bus("out", FormatTag::Universal).unwrap();
        let mut add = Addition::new(FormatTag::Channel);
        add.set_value(50);
        p2.insert_operator("split", Split::new(), ["in"], ["r", "g", "b"])
            .unwrap();
        p2.insert_operator("add", add, ["g"], ["g+"]).unwrap();
        p2.insert_operator("merge", Merge::new(), ["r", "g+", "b"], ["out"])
            .unwrap();
        p2.assign_layer("split", 0).unwrap();
        p2.assign_layer("add", 1).unwrap();
        p2.assign_layer("merge", 2).unwrap();
        p2.set_execution_order([0, 1, 2]).unwrap();

        let image = ImageData::from_u8(2, 1, 3, vec![10, 20, 30, 200, 220, 240]).unwrap();
        p2.write("in", image.clone()).unwrap();
        p2.run().unwrap();
        assert_eq!(
            p2.read("out").unwrap().to_u8(),
            vec![10, 70, 30, 200, 255, 240]
        );

        p.write("in", image.clone()).unwrap();
        p.run().unwrap();
        assert_eq!(p.read("out").unwrap(), &image);
    }

    #[test]
    fn test_hadamard_with_smaller_mask() {
        let mut p = Pipeline::new();
        p.create_bus("image", FormatTag::Hsv).unwrap();
        p.create_bus("mask", FormatTag::Hsv).unwrap();
        p.create_bus("out", FormatTag::Triple).unwrap();
        p.insert_operator("mask", Hadamard::triple(), ["image", "mask"], ["out"])
            .unwrap();
        p.assign_layer("mask", 0).unwrap();
        p.set_execution_order([0]).unwrap();

        p.write("image", ImageData::filled(8, 8, 3, 200).unwrap()).unwrap();
        p.write("mask", ImageData::filled(2, 2, 3, 64).unwrap()).unwrap();
        p.run().unwrap();
        let out = p.read("out").unwrap();
        assert_eq!(out.shape(), (8, 8, 3));
        assert_eq!(out.to_u8(), vec![200; 8 * 8 * 3]);
    }

    #[test]
    fn test_repeated_runs_with_reset() {
        let mut p = fork_blend_pipeline(3, FormatTag::Channel);
        for value in [5u8, 128, 250] {
            p.reset_all();
            p.write("in", ImageData::filled(4, 4, 1, value).unwrap())
                .unwrap();
            p.run().unwrap();
            let out = p.take("out").unwrap().to_u8();
            assert!(out.iter().all(|v| v.abs_diff(value) <= 1));
        }
    }

    #[test]
    fn test_failed_run_recovers_after_reset() {
        let mut p = fork_blend_pipeline(2, FormatTag::Channel);
        p.write("in", ImageData::filled(2, 2, 1, 9).unwrap()).unwrap();
        p.set_param("blend", "weights", vec![1.0, -1.0]).unwrap();

        let err = p.run().unwrap_err();
        assert!(matches!(err, PipelineError::Kernel(_)));
        // The fork already wrote its outputs.
        assert!(!p.bus("branch0").unwrap().is_empty());

        p.set_param("blend", "weights", vec![1.0, 1.0]).unwrap();
        p.reset_all();
        p.write("in", ImageData::filled(2, 2, 1, 9).unwrap()).unwrap();
        p.run().unwrap();
        assert_eq!(p.read("out").unwrap().to_u8(), vec![9; 4]);
    }

    #[test]
    fn test_resized_fork_needs_rebinding() {
        let mut p = fork_blend_pipeline(2, FormatTag::Channel);
        p.set_param("fork", "number_of_outputs", 3).unwrap();
        p.write("in", ImageData::filled(2, 2, 1, 9).unwrap()).unwrap();
        assert!(matches!(p.run(), Err(PipelineError::Binding { .. })));
    }

    #[test]
    fn test_channel_into_triple_port_rejected() {
        let mut p = Pipeline::new();
        p.create_bus("in", FormatTag::Channel).unwrap();
        for bus in ["a", "b", "c"] {
            p.create_bus(bus, FormatTag::Channel).unwrap();
        }
        p.insert_operator("split", Split::new(), ["in"], ["a", "b", "c"])
            .unwrap();
        p.assign_layer("split", 0).unwrap();
        p.set_execution_order([0]).unwrap();
        p.write("in", ImageData::filled(1, 1, 1, 0).unwrap()).unwrap();
        let err = p.run().unwrap_err();
        assert!(err.is_build_error());
    }

    #[test]
    fn test_bypass_between_layers() {
        let mut p = Pipeline::new();
        for bus in ["a", "b", "c"] {
            p.create_bus(bus, FormatTag::Universal).unwrap();
        }
        p.insert_operator("first", Bypass::default(), ["a"], ["b"]).unwrap();
        p.insert_operator("second", Bypass::default(), ["b"], ["c"]).unwrap();
        p.assign_layer("first", 0).unwrap();
        p.assign_layer("second", 1).unwrap();
        p.set_execution_order([0, 1]).unwrap();

        let image = ImageData::from_u8(1, 2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        p.write("a", image.clone()).unwrap();
        p.run().unwrap();
        assert_eq!(p.read("c").unwrap(), &image);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(99);
        let image = random_image(&mut rng, 32, 24, 3);
        let mask = random_image(&mut rng, 7, 5, 3);

        let build = |mode: ExecutionMode| {
            let mut p = Pipeline::new().with_execution_mode(mode);
            p.create_bus("in", FormatTag::Rgb).unwrap();
            p.create_bus("mask", FormatTag::Triple).unwrap();
            p.create_bus("masked", FormatTag::Triple).unwrap();
            for bus in ["r", "g", "b", "r2", "g2", "b2"] {
                p.create_bus(bus, FormatTag::Channel).unwrap();
            }
            p.create_bus("out", FormatTag::Triple).unwrap();

            let mut hadamard = Hadamard::triple();
            hadamard.set_uniform_normalization(false);
            p.insert_operator("hadamard", hadamard, ["in", "mask"], ["masked"])
                .unwrap();
            p.insert_operator("split", Split::new(), ["masked"], ["r", "g", "b"])
                .unwrap();
            for (i, (src, dst)) in [("r", "r2"), ("g", "g2"), ("b", "b2")].into_iter().enumerate() {
                let mut product = Product::new(FormatTag::Channel);
                product.set_value(1.0 + i as f64 * 0.25);
                let name = format!("gain_{src}");
                p.insert_operator(name.as_str(), product, [src], [dst]).unwrap();
                p.assign_layer(name.as_str(), 2).unwrap();
            }
            p.insert_operator("merge", Merge::new(), ["r2", "g2", "b2"], ["out"])
                .unwrap();
            p.assign_layer("hadamard", 0).unwrap();
            p.assign_layer("split", 1).unwrap();
            p.assign_layer("merge", 3).unwrap();
            p.set_execution_order([0, 1, 2, 3]).unwrap();
            p
        };

        let mut sequential = build(ExecutionMode::Sequential);
        let mut parallel = build(ExecutionMode::Parallel);
        for p in [&mut sequential, &mut parallel] {
            p.write("in", image.clone()).unwrap();
            p.write("mask", mask.clone()).unwrap();
            p.run().unwrap();
        }
        assert_eq!(sequential.read("out").unwrap(), parallel.read("out").unwrap());
    }

    #[test]
    fn test_manifest_file_end_to_end() {
        use std::io::Write;

        let yaml = r#"
buses:
  - { name: photo, format: bgr }
  - { name: b, format: channel }
  - { name: g, format: channel }
  - { name: r, format: channel }
  - { name: g_dark, format: channel }
  - { name: result, format: triple }
operators:
  - name: split
    type: Split
    layer: 0
    inputs: [photo]
    outputs: [b, g, r]
  - name: darken
    type: ChannelAddition
    layer: 1
    inputs: [g]
    outputs: [g_dark]
    params: { value: -100 }
  - name: merge
    type: Merge
    layer: 2
    inputs: [b, g_dark, r]
    outputs: [result]
sequence: [0, 1, 2]
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let manifest = Manifest::from_file(file.path()).unwrap();
        let registry = Registry::builtin();
        let mut p = manifest.build(&registry).unwrap();
        assert_eq!(p.operator("darken").unwrap().type_name(), "ChannelAddition");

        let photo = ImageData::from_u8(2, 1, 3, vec![1, 150, 3, 4, 50, 6]).unwrap();
        p.write("photo", photo.clone()).unwrap();
        p.run().unwrap();
        assert_eq!(
            p.read("result").unwrap().to_u8(),
            vec![1, 50, 3, 4, 0, 6]
        );

        // A Universal producer cannot feed a Channel bus.
        let yaml = yaml.replace("type: ChannelAddition", "type: Addition");
        let mut p = Manifest::from_yaml_str(&yaml)
            .unwrap()
            .build(&registry)
            .unwrap();
        p.write("photo", photo).unwrap();
        assert!(matches!(p.run(), Err(PipelineError::Binding { .. })));
    }

    #[test]
    fn test_manifest_universal_chain() {
        let yaml = "
buses:
  - { name: src, format: universal }
  - { name: mid, format: universal }
  - { name: dst, format: universal }
operators:
  - { name: add, type: Addition, layer: a, inputs: [src], outputs: [mid], params: { value: 10 } }
  - { name: gain, type: Product, layer: b, inputs: [mid], outputs: [dst], params: { value: 0.5, offset: 0 } }
sequence: [a, b]
";
        let mut p = Manifest::from_yaml_str(yaml)
            .unwrap()
            .build(&Registry::builtin())
            .unwrap();
        p.write("src", ImageData::from_u8(2, 1, 3, vec![0, 10, 20, 30, 40, 250]).unwrap())
            .unwrap();
        p.run().unwrap();
        // (v + 10) * 0.5; the addition clips 260 to 255 first.
        assert_eq!(p.read("dst").unwrap().to_u8(), vec![5, 10, 15, 20, 25, 127]);
    }
}
