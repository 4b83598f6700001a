use std::collections::HashMap;

use kiln_ir::Format;
use smallvec::SmallVec;
use strum::IntoEnumIterator;

use super::predicate::{self, Predicate};
use super::{StrategyId, TransformKind};
use crate::transfer_info::TransferInfo;

use TransformKind::*;

type Tokens = SmallVec<[TransformKind; 6]>;

/// 4-D plain formats.
const P4: [Format; 4] = [Format::Nchw, Format::Nhwc, Format::Hwcn, Format::Chwn];
/// 5-D plain formats.
const P5: [Format; 3] = [Format::Ndhwc, Format::Ncdhw, Format::Dhwcn];

/// Result of a strategy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Conversion sequence, in execution order. Empty means nothing to do.
    Tokens(&'a [TransformKind]),
    Forbidden,
    Missing,
}

/// Immutable map from strategy ids to conversion sequences.
///
/// Built once when the pass context is created and shared by reference.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    strategies: HashMap<StrategyId, Tokens>,
    predicates: HashMap<(Format, Format), Vec<(Predicate, u32)>>,
    hops: HashMap<StrategyId, Format>,
}

impl StrategyTable {
    pub fn new() -> Self {
        let mut table = Self { strategies: HashMap::new(), predicates: HashMap::new(), hops: HashMap::new() };

        for format in Format::iter() {
            table.set(format, format, &[UnsqueezeV2, SqueezeV2, Reshape, Cast]);
        }

        for src in P4 {
            for dst in P4.into_iter().filter(|dst| *dst != src) {
                table.set(src, dst, &[Transpose, Cast]);
            }
        }

        for plain in P4.into_iter().chain(P5) {
            table.set(plain, Format::Nd, &[Reformat, Cast, SqueezeV2, Reshape]);
            table.set(Format::Nd, plain, &[Reshape, Reformat, Cast]);
        }

        for plain in P4 {
            for fractal in [Format::Nc1hwc0, Format::Nc1hwc0C04] {
                table.set(plain, fractal, &[UnsqueezeV2, Reshape, Cast, TransData]);
                table.set(fractal, plain, &[TransData, Cast, SqueezeV2, Reshape]);
            }
            table.set(plain, Format::FractalNz, &[Reformat, Cast, TransData]);
            table.set(Format::FractalNz, plain, &[TransData, Reformat, Cast]);
            table.hop(plain, Format::FractalNz, 0, Format::Nd);
            table.hop(Format::FractalNz, plain, 0, Format::Nd);
        }

        for fractal in [Format::Nc1hwc0, Format::Nc1hwc0C04, Format::FractalZ] {
            table.set(Format::Nd, fractal, &[Reshape, Cast, TransData]);
            table.set(fractal, Format::Nd, &[TransData, Cast]);
        }

        for plain in [Format::Nchw, Format::Nhwc, Format::Hwcn] {
            for weight in [Format::FractalZ, Format::FractalZC04, Format::C1hwncoc0] {
                table.set(plain, weight, &[Reshape, Cast, TransData]);
                table.set(weight, plain, &[TransData, Cast, SqueezeV2, Reshape]);
            }
            table.predicate(plain, Format::FractalZ, predicate::fractal_z_grouped, StrategyId::GROUPED);
            table.predicate(Format::FractalZ, plain, predicate::fractal_z_grouped, StrategyId::GROUPED);
        }

        // Grouped weights are regrouped in HWCN, the only order TransData accepts for them.
        for plain in [Format::Nchw, Format::Nhwc] {
            table.set_bits(plain, Format::FractalZ, StrategyId::GROUPED, &[Transpose, Cast, TransData]);
            table.set_bits(Format::FractalZ, plain, StrategyId::GROUPED, &[TransData, Transpose, Cast]);
            table.hop(plain, Format::FractalZ, StrategyId::GROUPED, Format::Hwcn);
            table.hop(Format::FractalZ, plain, StrategyId::GROUPED, Format::Hwcn);
        }
        table.set_bits(Format::Hwcn, Format::FractalZ, StrategyId::GROUPED, &[Cast, TransData]);
        table.set_bits(Format::FractalZ, Format::Hwcn, StrategyId::GROUPED, &[TransData, Cast]);

        table.set(Format::Nd, Format::FractalNz, &[Cast, TransData]);
        table.set(Format::FractalNz, Format::Nd, &[TransData, Cast]);

        for plain in P5 {
            table.set(plain, Format::Ndc1hwc0, &[UnsqueezeV2, Reshape, Cast, TransData]);
            table.set(Format::Ndc1hwc0, plain, &[TransData, Cast, SqueezeV2, Reshape]);
            table.set(plain, Format::FractalZ3d, &[Reshape, Cast, TransData]);
            table.set(Format::FractalZ3d, plain, &[TransData, Cast]);
        }

        for rnn in [Format::FractalZnRnn, Format::NdRnnBias] {
            table.set(Format::Nd, rnn, &[Cast, TransDataRnn]);
            table.set(rnn, Format::Nd, &[TransDataRnn, Cast]);
        }

        for (a, b) in [
            (Format::Nc1hwc0, Format::FractalZ),
            (Format::Nc1hwc0, Format::FractalNz),
            (Format::FractalZ, Format::FractalNz),
            (Format::FractalZ, Format::FractalZ3d),
            (Format::Nc1hwc0, Format::Ndc1hwc0),
            (Format::FractalZ, Format::FractalZC04),
        ] {
            table.set(a, b, &[Forbidden]);
            table.set(b, a, &[Forbidden]);
        }

        table
    }

    /// Strategy id for converting `src` into `dst`, refined by the first
    /// registered predicate that holds for `info`.
    pub fn compute_strategy_id(&self, src: Format, dst: Format, info: &TransferInfo) -> StrategyId {
        let id = StrategyId::new(src, dst);
        let bits = self
            .predicates
            .get(&(src, dst))
            .and_then(|preds| preds.iter().find(|(pred, _)| pred(info)))
            .map_or(0, |(_, bits)| *bits);
        id.with_extra_bits(bits)
    }

    pub fn lookup(&self, id: StrategyId) -> Lookup<'_> {
        match self.strategies.get(&id) {
            None => Lookup::Missing,
            Some(tokens) if tokens.contains(&Forbidden) => Lookup::Forbidden,
            Some(tokens) => Lookup::Tokens(tokens),
        }
    }

    /// Intermediate format a `Transpose`/`TransData` step converts into first.
    pub fn hop_format(&self, id: StrategyId) -> Option<Format> {
        self.hops.get(&id).copied()
    }

    fn set(&mut self, src: Format, dst: Format, tokens: &[TransformKind]) {
        self.set_bits(src, dst, 0, tokens);
    }

    fn set_bits(&mut self, src: Format, dst: Format, bits: u32, tokens: &[TransformKind]) {
        self.strategies.insert(StrategyId::new(src, dst).with_extra_bits(bits), Tokens::from_slice(tokens));
    }

    fn predicate(&mut self, src: Format, dst: Format, pred: Predicate, bits: u32) {
        self.predicates.entry((src, dst)).or_default().push((pred, bits));
    }

    fn hop(&mut self, src: Format, dst: Format, bits: u32, via: Format) {
        self.hops.insert(StrategyId::new(src, dst).with_extra_bits(bits), via);
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new()
    }
}
