//! Static plug-in registry.
//!
//! Operators are grouped in plug-ins, each carrying its metadata and a table
//! of exported type names. [`Registry::builtin`] links every operator of this
//! crate; applications may [`register`](Registry::register) their own.
//!
//! ```rust
//! use ipp_ops::Registry;
//!
//! let registry = Registry::builtin();
//! let fork = registry.create("TripleFork").unwrap();
//! assert_eq!(fork.output_formats().len(), 2);
//! assert!(registry.create("Sharpen").is_err());
//! ```

use crate::{Addition, Blend, Bypass, Fork, Hadamard, Merge, Product, Split};
use ipp_core::FormatTag;
use ipp_pipeline::Operator;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No plug-in exports this type name.
    #[error("unknown operator type: {name}")]
    UnknownOperatorType {
        /// Requested type name.
        name: String,
    },

    /// Two plug-ins export the same type name.
    #[error("operator type {name} of plug-in '{plugin}' is already registered")]
    DuplicateOperatorType {
        /// Conflicting type name.
        name: String,
        /// Plug-in being registered.
        plugin: String,
    },

    /// A constructor builds an operator reporting another type name.
    #[error("plug-in '{plugin}' exports {name}, but its operator reports {type_name}")]
    TypeNameMismatch {
        /// Exported type name.
        name: String,
        /// What the built operator reports.
        type_name: String,
        /// Plug-in being registered.
        plugin: String,
    },
}

/// Plug-in metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    /// Plug-in name.
    pub name: &'static str,
    /// Author.
    pub author: &'static str,
    /// Contact address.
    pub email: &'static str,
    /// Where the source lives.
    pub source: &'static str,
    /// Version of the plug-in itself.
    pub plugin_version: (u32, u32, u32),
    /// Version of the pipeline API it was written against.
    pub ipp_version: (u32, u32, u32),
}

/// Constructor of a default-configured operator.
pub type Constructor = fn() -> Box<dyn Operator>;

/// A set of operator types with shared metadata.
#[derive(Debug, Clone)]
pub struct Plugin {
    /// Metadata.
    pub info: PluginInfo,
    /// Exported type names and their constructors.
    pub operators: Vec<(&'static str, Constructor)>,
}

impl Plugin {
    /// Exported type names.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operators.iter().map(|(name, _)| *name)
    }
}

/// Turns an operator expression into a [`Constructor`].
macro_rules! ctor {
    ($op:expr) => {{
        fn construct() -> Box<dyn Operator> {
            Box::new($op)
        }
        construct as Constructor
    }};
}

const AUTHOR: &str = "Filipe Chagas";
const EMAIL: &str = "filipe.ferraz0@gmail.com";
const SOURCE: &str = "https://github.com/FilipeChagasDev/image-processing-pipeline";

fn info(name: &'static str, version: (u32, u32, u32)) -> PluginInfo {
    PluginInfo {
        name,
        author: AUTHOR,
        email: EMAIL,
        source: SOURCE,
        plugin_version: version,
        ipp_version: version,
    }
}

/// The plug-ins shipped with this crate.
pub fn builtin_plugins() -> Vec<Plugin> {
    vec![
        Plugin {
            info: info("bypass", (0, 1, 0)),
            operators: vec![
                ("Bypass", ctor!(Bypass::default())),
                ("ChannelBypass", ctor!(Bypass::new(FormatTag::Channel))),
                ("TripleBypass", ctor!(Bypass::new(FormatTag::Triple))),
            ],
        },
        Plugin {
            info: info("addition", (0, 1, 0)),
            operators: vec![
                ("Addition", ctor!(Addition::default())),
                ("ChannelAddition", ctor!(Addition::new(FormatTag::Channel))),
                ("TripleAddition", ctor!(Addition::new(FormatTag::Triple))),
            ],
        },
        Plugin {
            info: info("product", (1, 0, 0)),
            operators: vec![
                ("Product", ctor!(Product::default())),
                ("ChannelProduct", ctor!(Product::new(FormatTag::Channel))),
                ("TripleProduct", ctor!(Product::new(FormatTag::Triple))),
            ],
        },
        Plugin {
            info: info("hadamard", (1, 0, 0)),
            operators: vec![
                ("ChannelHadamard", ctor!(Hadamard::channel())),
                ("TripleHadamard", ctor!(Hadamard::triple())),
            ],
        },
        Plugin {
            info: info("split & merge", (1, 0, 0)),
            operators: vec![
                ("Split", ctor!(Split::new())),
                ("Merge", ctor!(Merge::new())),
            ],
        },
        Plugin {
            info: info("fork & blend", (0, 1, 0)),
            operators: vec![
                ("ChannelFork", ctor!(Fork::channel())),
                ("TripleFork", ctor!(Fork::triple())),
                ("ChannelBlend", ctor!(Blend::channel())),
                ("TripleBlend", ctor!(Blend::triple())),
            ],
        },
    ]
}

/// Lookup table from operator type name to constructor.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    plugins: Vec<Plugin>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding [`builtin_plugins`].
    pub fn builtin() -> Self {
        Self {
            plugins: builtin_plugins(),
        }
    }

    /// Adds a plug-in.
    ///
    /// Every constructor is called once to check that the operator it builds
    /// reports the type name it is exported under.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateOperatorType`] if one of its type names is
    ///   already registered
    /// - [`RegistryError::TypeNameMismatch`] if an operator reports another
    ///   type name than its key
    ///
    /// On error the registry is left unchanged.
    pub fn register(&mut self, plugin: Plugin) -> Result<(), RegistryError> {
        if let Some(name) = plugin.type_names().find(|n| self.constructor(n).is_some()) {
            return Err(RegistryError::DuplicateOperatorType {
                name: name.to_string(),
                plugin: plugin.info.name.to_string(),
            });
        }
        for (name, ctor) in &plugin.operators {
            let type_name = ctor().type_name();
            if type_name != *name {
                return Err(RegistryError::TypeNameMismatch {
                    name: name.to_string(),
                    type_name: type_name.to_string(),
                    plugin: plugin.info.name.to_string(),
                });
            }
        }
        debug!(plugin = plugin.info.name, types = plugin.operators.len(), "register");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Registered plug-ins.
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Metadata of a plug-in by name.
    pub fn plugin(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins.iter().map(|p| &p.info).find(|i| i.name == name)
    }

    /// Every registered type name.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().flat_map(|p| p.type_names())
    }

    fn constructor(&self, type_name: &str) -> Option<Constructor> {
        self.plugins
            .iter()
            .flat_map(|p| p.operators.iter())
            .find(|(name, _)| *name == type_name)
            .map(|(_, ctor)| *ctor)
    }

    /// Builds a default-configured operator.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownOperatorType`] if no plug-in exports it.
    pub fn create(&self, type_name: &str) -> Result<Box<dyn Operator>, RegistryError> {
        let ctor = self
            .constructor(type_name)
            .ok_or_else(|| RegistryError::UnknownOperatorType {
                name: type_name.to_string(),
            })?;
        Ok(ctor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipp_core::ImageData;
    use ipp_pipeline::{PipelineResult, Signature};

    /// Application-defined operator.
    struct Negate(Signature);

    impl Default for Negate {
        fn default() -> Self {
            Self(Signature::new(
                vec![FormatTag::Universal],
                vec![FormatTag::Universal],
            ))
        }
    }

    impl Operator for Negate {
        fn type_name(&self) -> &'static str {
            "Negate"
        }

        fn signature(&self) -> &Signature {
            &self.0
        }

        fn run(&self, inputs: Vec<ImageData>) -> PipelineResult<Vec<ImageData>> {
            Ok(inputs.iter().map(|img| img.map(|v| 255.0 - v)).collect())
        }
    }

    #[test]
    fn test_builtin_metadata() {
        let registry = Registry::builtin();
        let names: Vec<_> = registry.plugins().iter().map(|p| p.info.name).collect();
        assert_eq!(
            names,
            ["bypass", "addition", "product", "hadamard", "split & merge", "fork & blend"]
        );
        let hadamard = registry.plugin("hadamard").unwrap();
        assert_eq!(hadamard.plugin_version, (1, 0, 0));
        assert_eq!(hadamard.author, "Filipe Chagas");
        assert_eq!(registry.plugin("fork & blend").unwrap().ipp_version, (0, 1, 0));
    }

    #[test]
    fn test_created_type_names_match_keys() {
        let registry = Registry::builtin();
        let names: Vec<_> = registry.type_names().collect();
        assert_eq!(names.len(), 17);
        for name in names {
            assert_eq!(registry.create(name).unwrap().type_name(), name);
        }
    }

    #[test]
    fn test_formats_of_created_operators() {
        let registry = Registry::builtin();
        let split = registry.create("Split").unwrap();
        assert_eq!(split.input_formats(), &[FormatTag::Triple]);
        assert_eq!(split.output_formats(), &[FormatTag::Channel; 3]);
        let blend = registry.create("ChannelBlend").unwrap();
        assert_eq!(blend.input_formats(), &[FormatTag::Channel; 2]);
    }

    #[test]
    fn test_unknown_type() {
        let err = Registry::builtin().create("Sharpen").err().expect("expected UnknownOperatorType error");
        assert!(matches!(err, RegistryError::UnknownOperatorType { ref name } if name == "Sharpen"));
        assert!(Registry::new().create("Bypass").is_err());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = Registry::builtin();
        let plugin = Plugin {
            info: info("my bypass", (0, 0, 1)),
            operators: vec![("Bypass", ctor!(Bypass::default()))],
        };
        assert!(registry.register(plugin).is_err());
        assert_eq!(registry.plugins().len(), 6);

        let plugin = Plugin {
            info: info("negate", (0, 0, 1)),
            operators: vec![("Negate", ctor!(Negate::default()))],
        };
        registry.register(plugin).unwrap();
        let negate = registry.create("Negate").unwrap();
        assert_eq!(negate.type_name(), "Negate");
        assert_eq!(registry.type_names().count(), 18);
    }

    #[test]
    fn test_register_rejects_misnamed_operator() {
        let mut registry = Registry::builtin();
        // Bypass::new(Hsv) reports "TripleBypass".
        let plugin = Plugin {
            info: info("hsv bypass", (0, 0, 1)),
            operators: vec![("HsvBypass", ctor!(Bypass::new(FormatTag::Hsv)))],
        };
        let err = registry.register(plugin).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::TypeNameMismatch { ref name, ref type_name, .. }
                if name == "HsvBypass" && type_name == "TripleBypass"
        ));
        assert!(registry.create("HsvBypass").is_err());
        assert_eq!(registry.plugins().len(), 6);
    }
}
