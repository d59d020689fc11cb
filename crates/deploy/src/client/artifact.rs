//! Build artifact lookup for Hardhat and Foundry compiler output.

use std::path::{Path, PathBuf};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use serde::Deserialize;

use crate::{ChainError, ConstructorArgs, ContractName};

/// Directories under the artifacts root that never hold contract artifacts.
const SKIPPED_DIRS: &[&str] = &["build-info", "cache"];

/// A compiled contract: ABI plus creation bytecode.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildArtifact {
    pub contract: ContractName,
    pub path: PathBuf,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl BuildArtifact {
    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    ///
    /// Arguments are checked against the constructor inputs declared in the ABI.
    pub fn init_code(&self, args: &ConstructorArgs) -> Result<Bytes, ChainError> {
        let inputs = self
            .abi
            .constructor
            .as_ref()
            .map(|constructor| constructor.inputs.as_slice())
            .unwrap_or_default();

        if inputs.len() != args.len() {
            return Err(self.mismatch(format!(
                "expected {} argument(s), got {}",
                inputs.len(),
                args.len()
            )));
        }

        let mut values = Vec::with_capacity(args.len());
        for (index, (param, arg)) in inputs.iter().zip(args.iter()).enumerate() {
            let selector = param.selector_type();
            let ty = DynSolType::parse(&selector).map_err(|e| {
                self.mismatch(format!("unsupported parameter type `{selector}`: {e}"))
            })?;
            let value = arg.to_sol(&ty).ok_or_else(|| {
                self.mismatch(format!(
                    "argument {index} (`{}`) expects {selector}, got {} {arg}",
                    param.name,
                    arg.kind()
                ))
            })?;
            values.push(value);
        }

        let mut code = self.bytecode.to_vec();
        if !values.is_empty() {
            code.extend(DynSolValue::Tuple(values).abi_encode_params());
        }
        Ok(code.into())
    }

    fn mismatch(&self, reason: String) -> ChainError {
        ChainError::ArgumentMismatch {
            contract: self.contract.clone(),
            reason,
        }
    }
}

/// Artifact JSON as written by Hardhat (`bytecode: "0x.."`) or Foundry
/// (`bytecode: { object: "0x.." }`).
#[derive(Debug, Deserialize)]
struct RawArtifact {
    abi: JsonAbi,
    bytecode: RawBytecode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl RawBytecode {
    fn as_str(&self) -> &str {
        match self {
            Self::Hex(hex) | Self::Object { object: hex } => hex,
        }
    }
}

/// Resolves contract names to artifacts below a compiler output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find and load the single artifact for `contract`.
    ///
    /// A fully qualified name is looked up at its Hardhat path
    /// (`<root>/<source>/<Name>.json`) first; otherwise, and for the flat Foundry
    /// layout, the tree is scanned.
    pub fn resolve(&self, contract: &ContractName) -> Result<BuildArtifact, ChainError> {
        if let Some((source, name)) = contract.qualified_parts() {
            let exact = self.root.join(source).join(format!("{name}.json"));
            if exact.is_file() {
                return load_artifact(contract, exact);
            }
        }

        let mut candidates = Vec::new();
        self.collect_candidates(&self.root, contract, &mut candidates)
            .map_err(|e| ChainError::InvalidArtifact {
                contract: contract.clone(),
                reason: format!("failed to scan {}: {e}", self.root.display()),
            })?;
        candidates.sort();

        match candidates.len() {
            0 => Err(ChainError::ArtifactNotFound(contract.clone())),
            1 => load_artifact(contract, candidates.remove(0)),
            _ => Err(ChainError::AmbiguousArtifact {
                contract: contract.clone(),
                candidates,
            }),
        }
    }

    fn collect_candidates(
        &self,
        dir: &Path,
        contract: &ContractName,
        found: &mut Vec<PathBuf>,
    ) -> std::io::Result<()> {
        let file_name = format!("{}.json", contract.bare());

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                let skipped = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name));
                if !skipped {
                    self.collect_candidates(&path, contract, found)?;
                }
                continue;
            }

            if path.file_name().and_then(|name| name.to_str()) != Some(file_name.as_str()) {
                continue;
            }

            // Both layouts store `<Source>.sol/<Contract>.json`.
            if let Some(source_file) = contract.source_file() {
                let parent = path
                    .parent()
                    .and_then(|parent| parent.file_name())
                    .and_then(|name| name.to_str());
                if parent != Some(source_file) {
                    continue;
                }
            }

            found.push(path);
        }

        Ok(())
    }
}

fn load_artifact(contract: &ContractName, path: PathBuf) -> Result<BuildArtifact, ChainError> {
    let invalid = |reason: String| ChainError::InvalidArtifact {
        contract: contract.clone(),
        reason,
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| invalid(format!("failed to read {}: {e}", path.display())))?;
    let raw: RawArtifact = serde_json::from_str(&content)
        .map_err(|e| invalid(format!("failed to parse {}: {e}", path.display())))?;

    let hex_code = raw.bytecode.as_str().trim_start_matches("0x");
    if hex_code.is_empty() {
        return Err(invalid(
            "empty bytecode (abstract contract or interface)".to_string(),
        ));
    }
    if hex_code.contains("__") {
        return Err(invalid("bytecode has unlinked library placeholders".to_string()));
    }
    let bytecode = hex::decode(hex_code).map_err(|e| invalid(format!("invalid bytecode: {e}")))?;

    tracing::debug!(contract = %contract, path = %path.display(), "Resolved build artifact");

    Ok(BuildArtifact {
        contract: contract.clone(),
        path,
        abi: raw.abi,
        bytecode: bytecode.into(),
    })
}
