//! Lookup of compiled contract artifacts by contract name.
//!
//! Both Hardhat (`artifacts/contracts/<File>.sol/<Name>.json`, bytecode as a
//! hex string) and Foundry (`out/<File>.sol/<Name>.json`, bytecode nested in
//! an `object` field) layouts are understood.

use {
    alloy::primitives::Bytes,
    anyhow::{Context, Result, bail, ensure},
    serde::Deserialize,
    std::{
        fs,
        path::{Path, PathBuf},
    },
    walkdir::WalkDir,
};

/// Creation bytecode of a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractFactory {
    pub name: String,
    pub bytecode: Bytes,
    pub artifact: PathBuf,
}

impl ContractFactory {
    /// Finds the artifact for `name` somewhere below `artifacts_dir`.
    pub fn find(artifacts_dir: &Path, name: &str) -> Result<Self> {
        ensure!(
            artifacts_dir.is_dir(),
            "artifacts directory {} does not exist",
            artifacts_dir.display()
        );
        let file_name = format!("{name}.json");
        let mut candidates = Vec::new();
        for entry in WalkDir::new(artifacts_dir).follow_links(true) {
            let entry = entry.with_context(|| {
                format!("failed to search artifacts directory {}", artifacts_dir.display())
            })?;
            if entry.file_type().is_file() && entry.file_name().to_string_lossy() == file_name {
                candidates.push(entry.into_path());
            }
        }

        let artifact = match candidates.as_slice() {
            [] => bail!("no compiled artifact found for contract {name}"),
            [artifact] => artifact.clone(),
            [first, second, ..] => bail!(
                "contract name {name} is ambiguous: found {} and {}",
                first.display(),
                second.display()
            ),
        };
        Self::from_file(name, artifact)
    }

    pub fn from_file(name: &str, artifact: PathBuf) -> Result<Self> {
        let json = fs::read_to_string(&artifact)
            .with_context(|| format!("failed to read artifact {}", artifact.display()))?;
        let raw: RawArtifact = serde_json::from_str(&json).with_context(|| {
            format!(
                "failed to parse artifact {} (unlinked libraries are not supported)",
                artifact.display()
            )
        })?;
        if let Some(contract_name) = &raw.contract_name {
            ensure!(
                contract_name == name,
                "artifact {} belongs to contract {contract_name}",
                artifact.display()
            );
        }
        let bytecode = raw.bytecode.into_bytes();
        ensure!(
            !bytecode.is_empty(),
            "contract {name} has no bytecode, it is abstract or an interface"
        );
        Ok(Self {
            name: name.to_string(),
            bytecode,
            artifact,
        })
    }

    /// Bytecode of the contract creation transaction: the creation code
    /// followed by the ABI encoded constructor arguments.
    pub fn creation_code(&self, constructor_args: &Bytes) -> Bytes {
        [self.bytecode.as_ref(), constructor_args.as_ref()]
            .concat()
            .into()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    #[serde(default)]
    contract_name: Option<String>,
    bytecode: RawBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hardhat(Bytes),
    Foundry { object: Bytes },
}

impl RawBytecode {
    fn into_bytes(self) -> Bytes {
        match self {
            Self::Hardhat(bytes) | Self::Foundry { object: bytes } => bytes,
        }
    }
}
