use serde_json::{Value, json};

/// Audio filters understood by the node's ffmpeg pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    Bassboost,
    EightD,
    Vaporwave,
    Nightcore,
    Phaser,
    Tremolo,
    Vibrato,
    Reverse,
    Treble,
    Normalizer,
    Surrounding,
    Pulsator,
    Subboost,
    Karaoke,
    Flanger,
    Gate,
    Haas,
    Mcompand,
    Mono,
    Mstlr,
    Mstrr,
    Chorus,
    Chorus2d,
    Chorus3d,
    Fadein,
    Compressor,
    Expander,
    Softlimiter,
    /// Raw ffmpeg `-af` expression.
    Custom(String),
}

impl Filter {
    pub fn ffmpeg_arg(&self) -> &str {
        match self {
            Self::Bassboost => "bass=g=20:f=110:w=0.3",
            Self::EightD => "apulsator=hz=0.09",
            Self::Vaporwave => "aresample=48000,asetrate=48000*0.8",
            Self::Nightcore => "aresample=48000,asetrate=48000*1.25",
            Self::Phaser => "aphaser=in_gain=0.4",
            Self::Tremolo => "tremolo",
            Self::Vibrato => "vibrato=f=6.5",
            Self::Reverse => "areverse",
            Self::Treble => "treble=g=5",
            Self::Normalizer => "dynaudnorm=g=101",
            Self::Surrounding => "surround",
            Self::Pulsator => "apulsator=hz=1",
            Self::Subboost => "asubboost",
            Self::Karaoke => "stereotools=mlev=0.03",
            Self::Flanger => "flanger",
            Self::Gate => "agate",
            Self::Haas => "haas",
            Self::Mcompand => "mcompand",
            Self::Mono => "pan=mono|c0=.5*c0+.5*c1",
            Self::Mstlr => "stereotools=mode=ms>lr",
            Self::Mstrr => "stereotools=mode=ms>rr",
            Self::Chorus => "chorus=0.7:0.9:55:0.4:0.25:2",
            Self::Chorus2d => "chorus=0.6:0.9:50|60:0.4|0.32:0.25|0.4:2|1.3",
            Self::Chorus3d => "chorus=0.5:0.9:50|60|40:0.4|0.32|0.3:0.25|0.4|0.3:2|2.3|1.3",
            Self::Fadein => "afade=t=in:ss=0:d=10",
            Self::Compressor => "compand=points=-80/-105|-62/-80|-15.4/-15.4|0/-12|20/-7.6",
            Self::Expander => {
                "compand=attacks=0:points=-80/-169|-54/-80|-49.5/-64.6|-41.1/-41.1|-25.8/-15|-10.8/-4.5|0/0|20/8.3"
            }
            Self::Softlimiter => {
                "compand=attacks=0:points=-80/-80|-12.4/-12.4|-6/-8|0/-6.8|20/-2.8"
            }
            Self::Custom(expr) => expr,
        }
    }

    /// `PATCH api/player/{guild}` body applying this filter.
    pub fn patch_body(&self) -> Value {
        json!({ "data": { "encoder_args": ["-af", self.ffmpeg_arg()] } })
    }

    pub fn clear_body() -> Value {
        json!({ "data": { "encoder_args": [] } })
    }
}

impl std::str::FromStr for Filter {
    type Err = std::convert::Infallible;

    /// Unknown names are treated as raw ffmpeg expressions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "bassboost" => Self::Bassboost,
            "8d" => Self::EightD,
            "vaporwave" => Self::Vaporwave,
            "nightcore" => Self::Nightcore,
            "phaser" => Self::Phaser,
            "tremolo" => Self::Tremolo,
            "vibrato" => Self::Vibrato,
            "reverse" => Self::Reverse,
            "treble" => Self::Treble,
            "normalizer" => Self::Normalizer,
            "surrounding" => Self::Surrounding,
            "pulsator" => Self::Pulsator,
            "subboost" => Self::Subboost,
            "karaoke" => Self::Karaoke,
            "flanger" => Self::Flanger,
            "gate" => Self::Gate,
            "haas" => Self::Haas,
            "mcompand" => Self::Mcompand,
            "mono" => Self::Mono,
            "mstlr" => Self::Mstlr,
            "mstrr" => Self::Mstrr,
            "chorus" => Self::Chorus,
            "chorus2d" => Self::Chorus2d,
            "chorus3d" => Self::Chorus3d,
            "fadein" => Self::Fadein,
            "compressor" => Self::Compressor,
            "expander" => Self::Expander,
            "softlimiter" => Self::Softlimiter,
            _ => Self::Custom(s.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_body_wraps_encoder_args() {
        let body = Filter::Nightcore.patch_body();
        assert_eq!(
            body,
            json!({ "data": { "encoder_args": ["-af", "aresample=48000,asetrate=48000*1.25"] } })
        );
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("8D".parse::<Filter>().unwrap(), Filter::EightD);
        assert_eq!("BassBoost".parse::<Filter>().unwrap(), Filter::Bassboost);
        assert_eq!(
            "volume=0.5".parse::<Filter>().unwrap(),
            Filter::Custom("volume=0.5".into())
        );
    }
}
