pub(crate) mod model;
pub(crate) mod parse;

pub use model::{AstType, Config, ParserFlags};
pub use parse::{decode_options, OptionsMode, ParseOptions};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sourcemap_forced() {
        let flags = ParserFlags {
            require_blueprint_name: true,
            export_sourcemap: false,
        };
        let forced = flags.with_sourcemap();

        assert!(forced.export_sourcemap);
        assert!(forced.require_blueprint_name);
        assert!(!flags.export_sourcemap);
    }

    #[test]
    fn test_options_into_config() {
        let options = ParseOptions {
            require_blueprint_name: false,
            export_sourcemap: true,
            ast_type: Some(AstType::Ast),
        };
        let config: Config = options.into();
        assert_eq!(config.ast_type, AstType::Ast);
        assert!(config.flags.export_sourcemap);
    }
}
