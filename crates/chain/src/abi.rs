use alloy::sol;

// ─── Token Factory ──────────────────────────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract TokenFactory {
        event TokenCreated(
            address indexed token,
            address indexed creator,
            uint256 totalSupply
        );

        function creationFee() external view returns (uint256);

        function createToken(
            string memory name,
            string memory symbol,
            uint256 totalSupply
        ) external payable returns (address);

        function getAllUserTokens(address owner) external view returns (address[] memory);
    }
}

// ─── Minimal ERC-20 surface ─────────────────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract Erc20 {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function totalSupply() external view returns (uint256);
    }
}
