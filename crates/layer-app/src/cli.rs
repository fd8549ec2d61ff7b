use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use layer_core::ktx::KtxFile;
use layer_core::patterns::Pattern;
use layer_core::{AddressMode, FilterMode, SamplerConfig, TextureArray};

/// Inspect one layer of a 2D texture array at full resolution.
#[derive(Debug, Parser)]
#[command(name = "layer-view", version)]
pub struct Args {
    /// KTX 1.1 file to inspect. Takes precedence over --pattern.
    #[arg(long)]
    pub ktx: Option<PathBuf>,

    /// Built-in test pattern to show when no file is given.
    #[arg(long, value_enum, default_value_t = PatternArg::Primaries)]
    pub pattern: PatternArg,

    /// Edge length of generated patterns, in texels.
    #[arg(long, default_value_t = 256)]
    pub size: u32,

    /// Layer shown at startup (clamped to the array).
    #[arg(long, default_value_t = 0)]
    pub layer: u32,

    #[arg(long, value_enum, default_value_t = FilterArg::Nearest)]
    pub filter: FilterArg,

    #[arg(long, value_enum, default_value_t = AddressArg::Clamp)]
    pub address: AddressArg,

    /// Seconds per layer when cycling is toggled on with Space.
    #[arg(long, default_value_t = 1.0)]
    pub cycle: f32,

    /// Start with cycling enabled.
    #[arg(long)]
    pub autoplay: bool,

    /// Write the array as an uncompressed KTX file and exit.
    #[arg(long)]
    pub dump: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatternArg {
    Primaries,
    Checker,
    UvGradient,
    MipTint,
}

impl From<PatternArg> for Pattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Primaries => Pattern::Primaries,
            PatternArg::Checker => Pattern::Checker,
            PatternArg::UvGradient => Pattern::UvGradient,
            PatternArg::MipTint => Pattern::MipTint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AddressArg {
    Clamp,
    Repeat,
    Mirror,
}

impl Args {
    pub fn sampler_config(&self) -> SamplerConfig {
        let address = match self.address {
            AddressArg::Clamp => AddressMode::ClampToEdge,
            AddressArg::Repeat => AddressMode::Repeat,
            AddressArg::Mirror => AddressMode::MirrorRepeat,
        };
        let filter = match self.filter {
            FilterArg::Nearest => FilterMode::Nearest,
            FilterArg::Linear => FilterMode::Linear,
        };
        SamplerConfig::new(address, filter)
    }
}

// ---------------------------------------------------------------------------
// Source: where the texture array comes from
// ---------------------------------------------------------------------------

pub enum Source {
    Pattern(Pattern, TextureArray),
    Ktx(PathBuf, KtxFile),
}

impl Source {
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        if let Some(path) = &args.ktx {
            let file = KtxFile::open(path)
                .with_context(|| format!("loading {}", path.display()))?;
            return Ok(Source::Ktx(path.clone(), file));
        }
        let pattern = Pattern::from(args.pattern);
        let array = pattern
            .build(args.size, args.size)
            .with_context(|| format!("building pattern {}", pattern.name()))?;
        Ok(Source::Pattern(pattern, array))
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Pattern(pattern, _) => format!("pattern {}", pattern.name()),
            Source::Ktx(path, _) => path.display().to_string(),
        }
    }

    pub fn layer_count(&self) -> u32 {
        match self {
            Source::Pattern(_, array) => array.layer_count(),
            Source::Ktx(_, file) => file.layer_count,
        }
    }

    pub fn needs_bc_compression(&self) -> bool {
        matches!(self, Source::Ktx(_, file) if file.format.is_compressed())
    }

    /// CPU copy of the array, for sources that can be decoded.
    pub fn to_texture_array(&self) -> anyhow::Result<TextureArray> {
        match self {
            Source::Pattern(_, array) => Ok(array.clone()),
            Source::Ktx(_, file) => Ok(file.to_texture_array()?),
        }
    }
}
