//! TypeScript language backend — thin wrapper over the shared ECMAScript
//! walker, parameterized with the TypeScript grammar and extensions.

use crate::languages::javascript::EcmaParser;
use crate::parser_pool::ParserPool;

pub fn typescript_parser(pool: ParserPool) -> EcmaParser {
    EcmaParser::typescript(pool)
}
