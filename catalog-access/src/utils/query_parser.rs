//! Infix search text to postfix [`SearchOp`]s.
//!
//! Terms are bare words or double-quoted phrases, optionally prefixed with
//! `-`. `AND` binds tighter than `OR`, adjacent terms are joined with an
//! implicit `AND`, and parentheses group.

use crate::models::SearchOp;
use crate::services::ServiceError;

#[derive(Debug)]
enum Token {
    Term(String),
    And,
    Or,
    Open,
    Close,
}

/// Operator-stack entry: an open parenthesis or a pending operator.
#[derive(Debug)]
enum Pending {
    Open,
    Op(SearchOp),
}

fn precedence(op: &SearchOp) -> u8 {
    match op {
        SearchOp::And => 2,
        SearchOp::Or => 1,
        SearchOp::Match(_) => 0,
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ServiceError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            _ => {
                let mut term = String::new();

                if c == '-' {
                    term.push(c);
                    chars.next();
                }

                if chars.peek() == Some(&'"') {
                    term.push('"');
                    chars.next();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        term.push(c);
                        if c == '"' {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(ServiceError::InvalidQuery(
                            "unterminated quoted phrase".to_string(),
                        ));
                    }
                } else {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() || c == '(' || c == ')' {
                            break;
                        }
                        term.push(c);
                        chars.next();
                    }
                }

                tokens.push(match term.as_str() {
                    "-" => {
                        return Err(ServiceError::InvalidQuery(
                            "'-' must be followed by a term".to_string(),
                        ))
                    }
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    _ => Token::Term(term),
                });
            }
        }
    }

    Ok(tokens)
}

fn push_operator(op: SearchOp, ops: &mut Vec<Pending>, output: &mut Vec<SearchOp>) {
    while let Some(Pending::Op(top)) = ops.last() {
        if precedence(top) < precedence(&op) {
            break;
        }
        if let Some(Pending::Op(top)) = ops.pop() {
            output.push(top);
        }
    }
    ops.push(Pending::Op(op));
}

fn dangling_operator() -> ServiceError {
    ServiceError::InvalidQuery("operator without a left operand".to_string())
}

/// Parse infix search text. Blank text is the empty expression.
pub fn parse_query(input: &str) -> Result<Vec<SearchOp>, ServiceError> {
    let tokens = tokenize(input)?;
    let mut output = Vec::new();
    let mut ops: Vec<Pending> = Vec::new();
    let mut after_operand = false;

    for token in tokens {
        match token {
            Token::Term(text) => {
                if after_operand {
                    push_operator(SearchOp::And, &mut ops, &mut output);
                }
                output.push(SearchOp::Match(text));
                after_operand = true;
            }
            Token::Open => {
                if after_operand {
                    push_operator(SearchOp::And, &mut ops, &mut output);
                }
                ops.push(Pending::Open);
                after_operand = false;
            }
            Token::Close => {
                if !after_operand {
                    return Err(ServiceError::InvalidQuery(
                        "empty group or operator before ')'".to_string(),
                    ));
                }
                loop {
                    match ops.pop() {
                        Some(Pending::Open) => break,
                        Some(Pending::Op(op)) => output.push(op),
                        None => {
                            return Err(ServiceError::InvalidQuery(
                                "unbalanced ')'".to_string(),
                            ))
                        }
                    }
                }
            }
            Token::And => {
                if !after_operand {
                    return Err(dangling_operator());
                }
                push_operator(SearchOp::And, &mut ops, &mut output);
                after_operand = false;
            }
            Token::Or => {
                if !after_operand {
                    return Err(dangling_operator());
                }
                push_operator(SearchOp::Or, &mut ops, &mut output);
                after_operand = false;
            }
        }
    }

    if !after_operand && !(output.is_empty() && ops.is_empty()) {
        return Err(ServiceError::InvalidQuery(
            "query ends with an operator".to_string(),
        ));
    }

    while let Some(pending) = ops.pop() {
        match pending {
            Pending::Open => {
                return Err(ServiceError::InvalidQuery("unbalanced '('".to_string()))
            }
            Pending::Op(op) => output.push(op),
        }
    }

    Ok(output)
}
